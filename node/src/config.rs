use std::{env, num::NonZeroUsize, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use montecarlo::EstimatorConfig;

const DEFAULT_PARAMETERS: &str = "0,2,4,6";
const DEFAULT_BLOCK_SIZE: usize = 1000;
const DEFAULT_WORK_UNIT_MS: u64 = 500;

/// Where this node sits in the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Estimate in this process, no networking.
    Local,
    /// Coordinate slaves connecting on `port`, on every interface.
    Master { port: u16 },
    /// Serve the master listening at `addr`.
    Slave { addr: String },
}

impl FromStr for Endpoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "local" {
            return Ok(Self::Local);
        }

        let Some((host, port)) = s.rsplit_once(':') else {
            bail!("endpoint {s:?} is neither \"local\", \"*:<port>\" nor \"<host>:<port>\"");
        };

        let port: u16 = port
            .parse()
            .with_context(|| format!("invalid port in endpoint {s:?}"))?;

        match host {
            "*" => Ok(Self::Master { port }),
            "" => Err(anyhow!("missing host in endpoint {s:?}")),
            _ => Ok(Self::Slave { addr: s.to_string() }),
        }
    }
}

/// Everything a node needs to run, in any mode.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub endpoint: Endpoint,
    pub estimator: EstimatorConfig,
    /// Eb/N0 values to estimate at, in dB.
    pub parameters: Vec<f64>,
    pub block_size: NonZeroUsize,
    pub work_unit: Duration,
    pub slave_name: Option<String>,
}

impl NodeConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults for missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = EstimatorConfig::default();

        let endpoint = parse(&lookup, "ENDPOINT", Endpoint::Local)?;
        let accuracy = parse(&lookup, "ACCURACY", defaults.accuracy())?;
        let confidence = parse(&lookup, "CONFIDENCE", defaults.confidence())?;
        let estimator = EstimatorConfig::new(accuracy, confidence)?;

        let parameters = lookup("PARAMETERS").unwrap_or_else(|| DEFAULT_PARAMETERS.to_string());
        let parameters = parse_list(&parameters).context("invalid PARAMETERS")?;

        let block_size = parse(
            &lookup,
            "BLOCK_SIZE",
            NonZeroUsize::new(DEFAULT_BLOCK_SIZE).context("zero default block size")?,
        )?;
        let work_unit = Duration::from_millis(parse(&lookup, "WORK_UNIT_MS", DEFAULT_WORK_UNIT_MS)?);

        Ok(Self {
            endpoint,
            estimator,
            parameters,
            block_size,
            work_unit,
            slave_name: lookup("SLAVE_NAME"),
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Into<anyhow::Error>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(Into::<anyhow::Error>::into)
            .with_context(|| format!("invalid {key}: {value:?}")),
        None => Ok(default),
    }
}

fn parse_list(list: &str) -> Result<Vec<f64>> {
    let values = list
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
        bail!("expected a comma separated list of finite numbers, got {list:?}");
    }

    Ok(values)
}
