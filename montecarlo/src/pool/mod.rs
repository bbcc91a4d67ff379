//! Tracks every connected slave and the state it is in.

mod acceptor;
mod slave;

use std::{collections::BTreeMap, io, time::Duration};

use comms::{Link, Tag};
use futures::{FutureExt, future};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    time,
};

pub use acceptor::{Acceptor, ChannelAcceptor, Connector, Incoming};
pub use slave::{SlaveId, SlaveState};

use slave::Slave;

/// What ended a `SlavePool::wait_for_event` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Nothing happened before the timeout.
    Timeout,
    /// A new slave connected.
    Connected(SlaveId),
    /// At least one tracked link has inbound data or was closed.
    Readable,
}

/// The master side registry of slave connections.
///
/// Connections are keyed by a `SlaveId`, lookups by state are linear scans.
/// Only the coordinating task touches the pool, so it needs no locking.
pub struct SlavePool<A: Acceptor> {
    acceptor: A,
    slaves: BTreeMap<SlaveId, Slave<A::Reader, A::Writer>>,
    next_id: u64,
    busy_time_used: f64,
}

impl<A: Acceptor> SlavePool<A> {
    /// Creates an empty pool accepting new slaves from `acceptor`.
    pub fn new(acceptor: A) -> Self {
        Self {
            acceptor,
            slaves: BTreeMap::new(),
            next_id: 0,
            busy_time_used: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.slaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slaves.is_empty()
    }

    pub fn state(&self, id: SlaveId) -> Option<SlaveState> {
        self.slaves.get(&id).map(|s| s.state)
    }

    /// The name the slave reported when it connected.
    pub fn name(&self, id: SlaveId) -> Option<&str> {
        self.slaves.get(&id).map(|s| s.name.as_str())
    }

    /// Wall time this slave reported spending on samples over its whole connection,
    /// in seconds.
    pub fn busy_time(&self, id: SlaveId) -> Option<f64> {
        self.slaves.get(&id).map(|s| s.busy_time)
    }

    pub fn ids(&self) -> impl Iterator<Item = SlaveId> + '_ {
        self.slaves.keys().copied()
    }

    pub fn find_new(&self) -> Option<SlaveId> {
        self.find(SlaveState::New)
    }

    pub fn find_idle(&self) -> Option<SlaveId> {
        self.find(SlaveState::Idle)
    }

    pub fn find_pending(&self) -> Option<SlaveId> {
        self.find(SlaveState::EventPending)
    }

    pub fn count_working(&self) -> usize {
        self.slaves
            .values()
            .filter(|s| s.state == SlaveState::Working)
            .count()
    }

    pub fn any_working(&self) -> bool {
        self.slaves.values().any(|s| s.state == SlaveState::Working)
    }

    /// Gives access to the connection of a tracked slave.
    pub fn link(&mut self, id: SlaveId) -> Option<&mut Link<A::Reader, A::Writer>> {
        self.slaves.get_mut(&id).map(|s| &mut s.link)
    }

    /// Starts tracking an already established connection, in the `New` state.
    pub fn insert(&mut self, rx: A::Reader, tx: A::Writer, name: String) -> SlaveId {
        self.track(Link::new(rx, tx), name)
    }

    /// A `New` or `EventPending` slave becomes ready for work.
    pub fn mark_idle(&mut self, id: SlaveId) {
        self.transition(id, SlaveState::Idle, &[SlaveState::New, SlaveState::EventPending]);
    }

    /// An `Idle` slave was handed a work unit.
    pub fn mark_working(&mut self, id: SlaveId) {
        self.transition(id, SlaveState::Working, &[SlaveState::Idle]);
    }

    /// Forces a slave back to `New`, so it gets reinitialized.
    pub fn reset(&mut self, id: SlaveId) {
        if let Some(slave) = self.slaves.get_mut(&id) {
            debug!(slave = id.get(); "reset to new");
            slave.state = SlaveState::New;
        }
    }

    /// Forces every tracked slave back to `New`.
    pub fn reset_all(&mut self) {
        for slave in self.slaves.values_mut() {
            slave.state = SlaveState::New;
        }
    }

    /// Stops tracking a slave after a transport failure and closes its link.
    pub fn drop_slave(&mut self, id: SlaveId, reason: &io::Error) {
        if let Some(slave) = self.slaves.remove(&id) {
            warn!("dropping slave {id} ({}): {reason}", slave.name);
        }
    }

    /// Total wall time slaves reported spending on samples since the last
    /// `reset_busy_time`.
    pub fn busy_time_used(&self) -> f64 {
        self.busy_time_used
    }

    pub fn reset_busy_time(&mut self) {
        self.busy_time_used = 0.0;
    }

    /// Asks a slave (`GetCpuTime`) for the wall time it spent sampling since the
    /// previous query.
    ///
    /// # Args
    /// * `id` - The slave to query, which must not be working.
    ///
    /// # Returns
    /// The newly reported busy time, in seconds.
    ///
    /// # Errors
    /// Returns `io::Error` if the exchange fails or the slave is not tracked.
    pub async fn update_busy_time(&mut self, id: SlaveId) -> io::Result<f64> {
        let slave = self.slaves.get_mut(&id).ok_or_else(|| not_tracked(id))?;

        slave.link.tx.send_tag(Tag::GetCpuTime).await?;
        let used = slave.link.rx.recv_f64().await?;

        slave.busy_time += used;
        self.busy_time_used += used;
        Ok(used)
    }

    /// Blocks until a tracked link becomes readable, a new slave connects
    /// (only if `accept_new`) or `timeout` elapses.
    ///
    /// A new connection gets another `timeout` to report its name, so the call
    /// never blocks for more than twice `timeout`. On return every link with
    /// inbound data is marked `EventPending`, and links found closed are dropped.
    pub async fn wait_for_event(&mut self, accept_new: bool, timeout: Duration) -> Event {
        enum Fired<T> {
            Readable,
            Accepted(io::Result<T>),
        }

        let Self {
            acceptor, slaves, ..
        } = self;

        let fired = time::timeout(timeout, async {
            tokio::select! {
                _ = any_readable(slaves) => Fired::Readable,
                incoming = acceptor.accept(), if accept_new => Fired::Accepted(incoming),
            }
        })
        .await;

        let event = match fired {
            Err(_) => Event::Timeout,
            Ok(Fired::Readable) => Event::Readable,
            Ok(Fired::Accepted(Ok((rx, tx, peer)))) => match self.admit(rx, tx, peer, timeout).await {
                Some(id) => Event::Connected(id),
                None => Event::Timeout,
            },
            Ok(Fired::Accepted(Err(e))) => {
                warn!("failed to accept a connection: {e}");
                Event::Timeout
            }
        };

        self.sweep();
        event
    }

    /// Sends `Die` to every slave and closes all links.
    pub async fn shutdown(&mut self) {
        for (id, mut slave) in std::mem::take(&mut self.slaves) {
            if let Err(e) = slave.link.tx.send_tag(Tag::Die).await {
                debug!("slave {id} already gone: {e}");
            }
        }
    }

    fn find(&self, state: SlaveState) -> Option<SlaveId> {
        self.slaves
            .iter()
            .find(|(_, s)| s.state == state)
            .map(|(id, _)| *id)
    }

    fn transition(&mut self, id: SlaveId, to: SlaveState, from: &[SlaveState]) {
        let Some(slave) = self.slaves.get_mut(&id) else {
            return;
        };

        debug_assert!(
            from.contains(&slave.state),
            "slave {id} cannot go from {:?} to {to:?}",
            slave.state
        );

        debug!("slave {id}: {:?} -> {to:?}", slave.state);
        slave.state = to;
    }

    /// Tracks a just accepted connection, if it reports its name within `timeout`.
    async fn admit(
        &mut self,
        rx: A::Reader,
        tx: A::Writer,
        peer: String,
        timeout: Duration,
    ) -> Option<SlaveId> {
        let mut link = Link::new(rx, tx);

        let name = async {
            link.tx.send_tag(Tag::GetName).await?;
            link.rx.recv_string().await
        };

        let name = match time::timeout(timeout, name).await {
            Ok(name) => name,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "no name reported in time",
            )),
        };

        match name {
            Ok(name) => {
                info!("new slave connected: {name} at {peer}");
                Some(self.track(link, name))
            }
            Err(e) => {
                warn!("connection from {peer} failed before joining: {e}");
                None
            }
        }
    }

    fn track(&mut self, link: Link<A::Reader, A::Writer>, name: String) -> SlaveId {
        let id = SlaveId(self.next_id);
        self.next_id += 1;

        debug!("slave {id} is {name}");
        self.slaves.insert(id, Slave::new(link, name));
        id
    }

    /// Reclassifies, without blocking, every link with data or a closed peer.
    fn sweep(&mut self) {
        let mut closed: Vec<(SlaveId, io::Error)> = Vec::new();

        for (&id, slave) in &mut self.slaves {
            match slave.link.rx.readable().now_or_never() {
                Some(Ok(true)) if slave.state != SlaveState::EventPending => {
                    debug!("slave {id}: {:?} -> EventPending", slave.state);
                    slave.state = SlaveState::EventPending;
                }
                Some(Ok(false)) => closed.push((id, io::ErrorKind::UnexpectedEof.into())),
                Some(Err(e)) => closed.push((id, e)),
                _ => {}
            }
        }

        for (id, reason) in closed {
            self.drop_slave(id, &reason);
        }
    }
}

fn not_tracked(id: SlaveId) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("slave {id} is not tracked"))
}

/// Resolves once any of the links has inbound data or is closed.
async fn any_readable<R, W>(slaves: &mut BTreeMap<SlaveId, Slave<R, W>>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let waits: Vec<_> = slaves
        .values_mut()
        .map(|s| Box::pin(s.link.rx.readable()))
        .collect();

    if waits.is_empty() {
        return future::pending().await;
    }

    future::select_all(waits).await;
}
