use std::{error::Error, fmt, io};

/// The montecarlo module's result type.
pub type Result<T> = std::result::Result<T, EstimatorErr>;

/// All errors that can occur while setting up or running an estimation.
#[derive(Debug)]
pub enum EstimatorErr {
    /// Confidence level outside `(0.5, 1.0)`.
    InvalidConfidence(f64),
    /// Accuracy target outside `(0.0, 1.0)`.
    InvalidAccuracy(f64),
    /// The experiment declares a zero-sized result.
    EmptyResult,
    /// An underlying I/O error.
    Io(io::Error),
}

impl fmt::Display for EstimatorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfidence(c) => {
                write!(f, "confidence must lie in (0.5, 1.0), got {c}")
            }
            Self::InvalidAccuracy(a) => write!(f, "accuracy must lie in (0.0, 1.0), got {a}"),
            Self::EmptyResult => write!(f, "experiment produces an empty result vector"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for EstimatorErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for EstimatorErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
