//! Confidence driven Monte Carlo estimation, locally or over a pool of remote workers.
//!
//! An `Experiment` is sampled until the relative confidence interval of every
//! result dimension is within the configured accuracy. In distributed mode
//! the master ships the experiment to every connected worker and merges the
//! partial totals they send back.

pub mod confidence;
pub mod config;
pub mod digest;
pub mod error;
pub mod estimator;
pub mod experiment;
pub mod experiments;
pub mod interrupt;
pub mod pool;
pub mod progress;
pub mod protocol;
pub mod stats;

pub use config::EstimatorConfig;
pub use digest::Digest;
pub use error::{EstimatorErr, Result};
pub use estimator::MonteCarlo;
pub use experiment::Experiment;
pub use interrupt::Interrupt;
pub use pool::{Acceptor, ChannelAcceptor, SlavePool};
pub use progress::{LogProgress, Progress, Report};
pub use stats::{Estimate, RunningStats};
