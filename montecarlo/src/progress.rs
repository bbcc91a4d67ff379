use std::time::{Duration, Instant};

use log::info;

const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// A progress snapshot, handed to a `Progress` sink after each pass with new results.
#[derive(Debug, Clone, Copy)]
pub struct Report {
    /// Accumulated samples.
    pub samples: u64,
    /// Accuracy reached in percent, capped at 99 while it is not meaningful.
    pub accuracy_pct: f64,
    /// The smallest mean over all dimensions.
    pub mean: f64,
    /// Connected workers, `None` when running locally.
    pub slaves: Option<usize>,
    /// Accumulated worker busy time over wall time.
    pub speedup: Option<f64>,
}

impl Report {
    /// Maps an accuracy value onto the displayed percentage.
    pub fn percent(accuracy: f64) -> f64 {
        if accuracy < 1.0 { 100.0 * accuracy } else { 99.0 }
    }
}

/// Observability sink for the estimation loops.
pub trait Progress {
    fn report(&mut self, report: &Report);
}

/// Logs progress at info level, at most twice per second.
#[derive(Debug)]
pub struct LogProgress {
    last: Option<Instant>,
}

impl LogProgress {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for LogProgress {
    fn report(&mut self, report: &Report) {
        if self.last.is_some_and(|t| t.elapsed() < UPDATE_INTERVAL) {
            return;
        }

        self.last = Some(Instant::now());

        match (report.slaves, report.speedup) {
            (Some(slaves), Some(speedup)) => info!(
                "{slaves} clients, {speedup:.3}x speedup, pass {}, [{:.3e} +/- {:.3}%]",
                report.samples, report.mean, report.accuracy_pct
            ),
            _ => info!(
                "local, pass {}, [{:.3e} +/- {:.3}%]",
                report.samples, report.mean, report.accuracy_pct
            ),
        }
    }
}

/// Discards every report.
#[derive(Debug, Default)]
pub struct Silent;

impl Progress for Silent {
    fn report(&mut self, _report: &Report) {}
}
