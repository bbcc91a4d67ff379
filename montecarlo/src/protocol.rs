//! The exchanges between the estimator and its workers, on top of `comms`.

use std::io;

use comms::{LinkReceiver, LinkSender};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{digest::Digest, stats::RunningStats};

/// Receives the serialized experiment.
pub const GET_CODE: &str = "slave_getcode";
/// Receives the operating parameter and reseeds.
pub const GET_SNR: &str = "slave_getsnr";
/// Samples for one work unit and replies with a `WorkResult`.
pub const WORK: &str = "slave_work";

/// Partial totals produced by one work unit, tagged with what they were computed for.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkResult {
    /// Digest of the system, in its text form.
    pub digest: String,
    pub parameter: f64,
    pub sum: Vec<f64>,
    pub sum_sq: Vec<f64>,
    pub samples: u64,
}

impl WorkResult {
    /// Packs the totals of a work unit.
    pub fn new(digest: &Digest, parameter: f64, stats: &RunningStats) -> Self {
        Self {
            digest: digest.to_hex(),
            parameter,
            sum: stats.sum().to_vec(),
            sum_sq: stats.sum_sq().to_vec(),
            samples: stats.samples(),
        }
    }

    /// Whether these totals belong to the system `digest` at `parameter`.
    pub fn matches(&self, digest: &Digest, parameter: f64) -> bool {
        self.digest.parse::<Digest>().is_ok_and(|d| d == *digest) && self.parameter == parameter
    }

    pub async fn send<W: AsyncWrite + Unpin>(&self, tx: &mut LinkSender<W>) -> io::Result<()> {
        tx.send_str(&self.digest).await?;
        tx.send_f64(self.parameter).await?;
        tx.send_f64s(&self.sum).await?;
        tx.send_f64s(&self.sum_sq).await?;
        tx.send_u64(self.samples).await
    }

    pub async fn recv<R: AsyncRead + Unpin>(rx: &mut LinkReceiver<R>) -> io::Result<Self> {
        Ok(Self {
            digest: rx.recv_string().await?,
            parameter: rx.recv_f64().await?,
            sum: rx.recv_f64s().await?,
            sum_sq: rx.recv_f64s().await?,
            samples: rx.recv_u64().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_requires_digest_and_parameter() {
        let digest = Digest::of(b"system");
        let result = WorkResult::new(&digest, 2.5, &RunningStats::new(1));

        assert!(result.matches(&digest, 2.5));
        assert!(!result.matches(&digest, 3.0));
        assert!(!result.matches(&Digest::of(b"other"), 2.5));

        let garbled = WorkResult {
            digest: "zz".into(),
            ..result
        };
        assert!(!garbled.matches(&digest, 2.5));
    }
}
