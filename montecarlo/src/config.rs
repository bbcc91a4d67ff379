use crate::{
    confidence,
    error::{EstimatorErr, Result},
};

/// Samples required before convergence may be declared.
pub const MIN_SAMPLES: u64 = 128;

/// Stopping criteria of an estimation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    accuracy: f64,
    confidence: f64,
    min_samples: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            accuracy: 0.10,
            confidence: 0.95,
            min_samples: MIN_SAMPLES,
        }
    }
}

impl EstimatorConfig {
    /// Creates a new estimator configuration.
    ///
    /// # Args
    /// * `accuracy` - Target relative tolerance, in `(0, 1)`.
    /// * `confidence` - Confidence level of the tolerance, in `(0.5, 1)`.
    ///
    /// # Errors
    /// Returns `EstimatorErr` if either value is out of range.
    pub fn new(accuracy: f64, confidence: f64) -> Result<Self> {
        Self::default()
            .with_accuracy(accuracy)?
            .with_confidence(confidence)
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Result<Self> {
        if !(accuracy > 0.0 && accuracy < 1.0) {
            return Err(EstimatorErr::InvalidAccuracy(accuracy));
        }

        self.accuracy = accuracy;
        Ok(self)
    }

    pub fn with_confidence(mut self, confidence: f64) -> Result<Self> {
        confidence::cfactor(confidence)?;
        self.confidence = confidence;
        Ok(self)
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn min_samples(&self) -> u64 {
        self.min_samples
    }
}
