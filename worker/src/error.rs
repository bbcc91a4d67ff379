use std::{error::Error, fmt, io};

use comms::ProtocolErr;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker runtime failures. Every one of them ends the session.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    Protocol(ProtocolErr),
    /// A call that needs the system arrived before `slave_getcode`.
    NotInitialized { call: &'static str },
    /// The master sent a system this worker cannot rebuild.
    InvalidExperiment(io::Error),
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::Protocol(e) => write!(f, "protocol error: {e}"),
            WorkerErr::NotInitialized { call } => {
                write!(f, "{call} called before the system was received")
            }
            WorkerErr::InvalidExperiment(e) => write!(f, "invalid system description: {e}"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) | WorkerErr::InvalidExperiment(e) => Some(e),
            WorkerErr::Protocol(e) => Some(e),
            WorkerErr::NotInitialized { .. } => None,
        }
    }
}

/// Recovers worker and protocol errors that crossed an I/O boundary, such as
/// an unreserved tag from `recv_tag` or a failed handler.
impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        let Some(inner) = value.get_ref() else {
            return Self::Io(value);
        };

        if !inner.is::<ProtocolErr>() && !inner.is::<WorkerErr>() {
            return Self::Io(value);
        }

        let kind = value.kind();
        match value.into_inner().map(|e| e.downcast::<ProtocolErr>()) {
            Some(Ok(e)) => Self::Protocol(*e),
            Some(Err(e)) => match e.downcast::<WorkerErr>() {
                Ok(e) => *e,
                Err(e) => Self::Io(io::Error::new(kind, e)),
            },
            None => Self::Io(kind.into()),
        }
    }
}

impl From<ProtocolErr> for WorkerErr {
    fn from(value: ProtocolErr) -> Self {
        Self::Protocol(value)
    }
}

/// Boundary conversion for handlers and binaries.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
