mod config;

use anyhow::{Context, Result};
use log::{info, warn};
use montecarlo::{
    Estimate, Experiment, Interrupt, LogProgress, MonteCarlo, SlavePool, estimator,
    experiments::UncodedAwgn,
};
use tokio::{
    net::{TcpListener, TcpStream},
    signal,
};
use worker::{Worker, WorkerConfig};

use crate::config::{Endpoint, NodeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = NodeConfig::from_env()?;
    let system = UncodedAwgn::new(config.block_size);

    match &config.endpoint {
        Endpoint::Local => run_local(system, &config),
        Endpoint::Master { port } => run_master(system, &config, *port).await,
        Endpoint::Slave { addr } => run_slave(&config, addr).await,
    }
}

/// Sweeps every parameter in this process.
fn run_local(system: UncodedAwgn, config: &NodeConfig) -> Result<()> {
    let interrupt = Interrupt::global();
    interrupt.listen_ctrl_c();

    let mut mc = MonteCarlo::new(system, config.estimator)?;
    let mut progress = LogProgress::new();

    for &parameter in &config.parameters {
        mc.experiment_mut().set_parameter(parameter);

        let estimate =
            tokio::task::block_in_place(|| mc.estimate_local(interrupt, &mut progress))?;
        print_row(parameter, &estimate);

        if interrupt.is_raised() {
            break;
        }
    }

    Ok(())
}

/// Sweeps every parameter over the slaves that connect on `port`.
async fn run_master(system: UncodedAwgn, config: &NodeConfig, port: u16) -> Result<()> {
    let interrupt = Interrupt::global();
    interrupt.listen_ctrl_c();

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to listen on port {port}"))?;
    info!("waiting for slaves on port {port}");

    let mut pool = SlavePool::new(listener);
    let mut mc = MonteCarlo::new(system, config.estimator)?;
    let mut progress = LogProgress::new();

    for &parameter in &config.parameters {
        mc.experiment_mut().set_parameter(parameter);

        let estimate = mc
            .estimate_distributed(&mut pool, interrupt, &mut progress)
            .await?;
        print_row(parameter, &estimate);

        if interrupt.is_raised() {
            break;
        }
    }

    estimator::settle(&mut pool, interrupt).await;
    pool.shutdown().await;
    Ok(())
}

/// Serves the master at `addr` until it says goodbye.
async fn run_slave(config: &NodeConfig, addr: &str) -> Result<()> {
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to reach master at {addr}"))?;
    stream.set_nodelay(true)?;
    info!("connected to master at {addr}");

    if config.work_unit >= estimator::SETTLE_TIMEOUT {
        warn!(
            "work unit of {:?} outlasts the master's settle timeout, expect to be dropped between runs",
            config.work_unit
        );
    }

    let mut worker_config = WorkerConfig::default().with_work_unit(config.work_unit);
    if let Some(name) = &config.slave_name {
        worker_config = worker_config.with_name(name.as_str());
    }

    let (rx, tx) = stream.into_split();
    let worker = Worker::<_, _, UncodedAwgn>::new(rx, tx, worker_config);

    tokio::select! {
        ret = worker.run() => {
            ret?;
            info!("wrapping up, disconnecting...");
        }
        _ = signal::ctrl_c() => {
            warn!("received SIGINT");
        }
    }

    Ok(())
}

fn print_row(parameter: f64, estimate: &Estimate) {
    let status = if estimate.converged { "" } else { " (interrupted)" };

    println!(
        "{parameter:>7.2} dB  BER {:.4e}  FER {:.4e}  +/- {:.2}%  {} samples{status}",
        estimate.result[UncodedAwgn::BER],
        estimate.result[UncodedAwgn::FER],
        100.0 * estimate.accuracy,
        estimate.samples,
    );
}
