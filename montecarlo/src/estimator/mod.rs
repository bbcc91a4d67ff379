//! The Monte Carlo estimation loops.
//!
//! Both loops share the statistics and the stopping rule: the worst relative
//! tolerance over all result dimensions must reach the accuracy target, and at
//! least `min_samples` samples must have been accumulated. Only the way samples
//! are produced differs, locally one at a time or in batches from workers.

mod distributed;

use log::{debug, info, warn};

use crate::{
    config::EstimatorConfig,
    confidence,
    error::{EstimatorErr, Result},
    experiment::Experiment,
    interrupt::Interrupt,
    progress::{Progress, Report},
    stats::{Estimate, RunningStats},
};

pub use distributed::{PASS_TIMEOUT, SETTLE_TIMEOUT, settle};

/// Estimates the mean result of an `Experiment` to a given accuracy and confidence.
pub struct MonteCarlo<E: Experiment> {
    experiment: E,
    config: EstimatorConfig,
    cfactor: f64,
    stats: RunningStats,
}

impl<E: Experiment> MonteCarlo<E> {
    /// Creates a new estimator over `experiment`.
    ///
    /// # Args
    /// * `experiment` - The system to simulate, owned for the estimator's lifetime.
    /// * `config` - Accuracy and confidence targets.
    ///
    /// # Errors
    /// Returns `EstimatorErr::EmptyResult` if the experiment has no result dimensions.
    pub fn new(experiment: E, config: EstimatorConfig) -> Result<Self> {
        let count = dimension(&experiment)?;
        let cfactor = confidence::cfactor(config.confidence())?;

        Ok(Self {
            experiment,
            config,
            cfactor,
            stats: RunningStats::new(count),
        })
    }

    pub fn experiment(&self) -> &E {
        &self.experiment
    }

    /// Mutable access to the experiment, e.g. to move to the next parameter.
    pub fn experiment_mut(&mut self) -> &mut E {
        &mut self.experiment
    }

    pub fn into_experiment(self) -> E {
        self.experiment
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// The multiplier turning a standard deviation into a confidence bound.
    pub fn cfactor(&self) -> f64 {
        self.cfactor
    }

    /// Totals accumulated by the last (or ongoing) run.
    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    pub fn set_confidence(&mut self, confidence: f64) -> Result<()> {
        self.config = self.config.with_confidence(confidence)?;
        self.cfactor = confidence::cfactor(confidence)?;
        debug!("confidence set to {confidence}, cfactor {}", self.cfactor);
        Ok(())
    }

    pub fn set_accuracy(&mut self, accuracy: f64) -> Result<()> {
        self.config = self.config.with_accuracy(accuracy)?;
        debug!("accuracy set to {accuracy}");
        Ok(())
    }

    /// Samples the experiment in this process until convergence or interrupt.
    ///
    /// The experiment is seeded with zero, so local runs are reproducible.
    ///
    /// # Args
    /// * `interrupt` - Polled once per sample, stops the run when raised.
    /// * `progress` - Receives a report after every sample.
    ///
    /// # Returns
    /// The estimate reached, with `converged` unset if the run was interrupted.
    ///
    /// # Errors
    /// Returns `EstimatorErr::EmptyResult` if the experiment has no result dimensions.
    pub fn estimate_local(
        &mut self,
        interrupt: &Interrupt,
        progress: &mut dyn Progress,
    ) -> Result<Estimate> {
        let count = self.start_run()?;
        self.experiment.seed(0);

        let mut sample = vec![0.0; count];
        loop {
            self.experiment.sample(&mut sample);
            self.stats.accumulate(&sample);

            let estimate = self.evaluate();
            progress.report(&Report {
                samples: estimate.samples,
                accuracy_pct: Report::percent(estimate.accuracy),
                mean: estimate.worst_mean(),
                slaves: None,
                speedup: None,
            });

            if estimate.converged {
                info!("converged after {} samples", estimate.samples);
                return Ok(estimate);
            }

            if interrupt.is_raised() {
                warn!("interrupted after {} samples", estimate.samples);
                return Ok(estimate);
            }
        }
    }

    /// Zeroes the totals for a new run and returns the result dimension.
    fn start_run(&mut self) -> Result<usize> {
        let count = dimension(&self.experiment)?;
        self.stats = RunningStats::new(count);

        info!(
            "estimating {} at parameter {}",
            self.experiment.description(),
            self.experiment.parameter()
        );

        Ok(count)
    }

    /// The current estimate and whether it satisfies the stopping rule.
    fn evaluate(&self) -> Estimate {
        let mut estimate = self.stats.estimate(self.cfactor);
        estimate.converged = estimate.accuracy <= self.config.accuracy()
            && estimate.samples >= self.config.min_samples();
        estimate
    }
}

fn dimension<E: Experiment>(experiment: &E) -> Result<usize> {
    match experiment.count() {
        0 => Err(EstimatorErr::EmptyResult),
        count => Ok(count),
    }
}
