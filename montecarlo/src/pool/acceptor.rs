use std::io;

use async_trait::async_trait;
use futures::future;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        TcpListener,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
};

/// A freshly accepted connection: reader, writer and a peer label for logs.
pub type Incoming<R, W> = (R, W, String);

/// The source of new slave connections for a `SlavePool`.
#[async_trait]
pub trait Acceptor: Send {
    type Reader: AsyncRead + Unpin + Send + 'static;
    type Writer: AsyncWrite + Unpin + Send + 'static;

    /// Waits for the next incoming connection.
    ///
    /// Must be cancel safe: the pool drops this future whenever another event fires first.
    async fn accept(&mut self) -> io::Result<Incoming<Self::Reader, Self::Writer>>;
}

#[async_trait]
impl Acceptor for TcpListener {
    type Reader = OwnedReadHalf;
    type Writer = OwnedWriteHalf;

    async fn accept(&mut self) -> io::Result<Incoming<Self::Reader, Self::Writer>> {
        let (stream, addr) = TcpListener::accept(self).await?;
        stream.set_nodelay(true)?;
        let (rx, tx) = stream.into_split();
        Ok((rx, tx, addr.to_string()))
    }
}

/// Hands connections to a `ChannelAcceptor`.
pub type Connector<R, W> = mpsc::UnboundedSender<Incoming<R, W>>;

/// Accepts connections handed over in-process, such as in-memory duplex links.
pub struct ChannelAcceptor<R, W> {
    rx: mpsc::UnboundedReceiver<Incoming<R, W>>,
}

impl<R, W> ChannelAcceptor<R, W> {
    /// Creates a new acceptor along with the handle used to feed it connections.
    pub fn new() -> (Connector<R, W>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl<R, W> Acceptor for ChannelAcceptor<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Reader = R;
    type Writer = W;

    async fn accept(&mut self) -> io::Result<Incoming<R, W>> {
        match self.rx.recv().await {
            Some(incoming) => Ok(incoming),
            // Every connector is gone, nothing will ever arrive.
            None => future::pending().await,
        }
    }
}
