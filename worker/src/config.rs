use std::time::Duration;

/// Default wall time spent sampling per `slave_work` call.
pub const DEFAULT_WORK_UNIT: Duration = Duration::from_millis(500);

/// Immutable execution bounds for a worker instance.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    name: String,
    work_unit: Duration,
}

impl WorkerConfig {
    /// Creates a new worker configuration.
    ///
    /// # Args
    /// * `name` - Reported to the master on `GETNAME`.
    /// * `work_unit` - Wall time to keep sampling per work call, at least one
    ///   sample is always drawn.
    ///
    /// # Returns
    /// A `WorkerConfig` instance.
    pub fn new(name: impl Into<String>, work_unit: Duration) -> Self {
        Self {
            name: name.into(),
            work_unit,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_work_unit(mut self, work_unit: Duration) -> Self {
        self.work_unit = work_unit;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn work_unit(&self) -> Duration {
        self.work_unit
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new(format!("worker-{}", std::process::id()), DEFAULT_WORK_UNIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_override_defaults() {
        let config = WorkerConfig::default();
        assert!(config.name().starts_with("worker-"));
        assert_eq!(config.work_unit(), DEFAULT_WORK_UNIT);

        let config = config
            .with_name("rack-1")
            .with_work_unit(Duration::from_millis(50));
        assert_eq!(config.name(), "rack-1");
        assert_eq!(config.work_unit(), Duration::from_millis(50));
    }
}
