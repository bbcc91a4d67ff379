use std::fmt;

use comms::Link;
use tokio::io::{AsyncRead, AsyncWrite};

/// Stable identifier of a tracked connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlaveId(pub(super) u64);

impl SlaveId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SlaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a slave stands in the work cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlaveState {
    /// Connected, not yet given the current system.
    New,
    /// Has unread inbound data.
    EventPending,
    /// Ready to receive work.
    Idle,
    /// Work dispatched, result not yet read.
    Working,
}

pub(super) struct Slave<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(super) link: Link<R, W>,
    pub(super) state: SlaveState,
    pub(super) name: String,
    pub(super) busy_time: f64,
}

impl<R, W> Slave<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(super) fn new(link: Link<R, W>, name: String) -> Self {
        Self {
            link,
            state: SlaveState::New,
            name,
            busy_time: 0.0,
        }
    }
}
