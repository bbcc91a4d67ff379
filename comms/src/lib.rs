mod receiver;
pub mod rpc;
mod sender;
mod tag;

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

pub use receiver::LinkReceiver;
pub use rpc::{Handler, ProtocolErr, Registry};
pub use sender::LinkSender;
pub use tag::Tag;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// Upper bound for any length prefix accepted from the wire.
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024 * 1024;

/// Creates both `LinkReceiver` and `LinkSender` network channel parts.
///
/// Given a reader and a writer creates and returns both ends of the communication.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// A communication stream in the form of a link receiver and sender.
pub fn channel<R, W>(rx: R, tx: W) -> (LinkReceiver<R>, LinkSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (LinkReceiver::new(rx), LinkSender::new(tx))
}

/// Both halves of a single duplex connection, kept together.
pub struct Link<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub rx: LinkReceiver<R>,
    pub tx: LinkSender<W>,
}

impl<R, W> Link<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new `Link` from a reader and a writer.
    pub fn new(rx: R, tx: W) -> Self {
        let (rx, tx) = channel(rx, tx);
        Self { rx, tx }
    }

    /// Invokes the remote function registered under `name`.
    ///
    /// Sends the `Work` tag followed by the function name. Whatever exchange the
    /// remote handler performs afterwards is up to the caller.
    ///
    /// # Arguments
    /// * `name` - The name the remote side registered the handler with.
    ///
    /// # Returns
    /// A result object that returns `io::Error` on failure.
    pub async fn call(&mut self, name: &str) -> io::Result<()> {
        self.tx.send_tag(Tag::Work).await?;
        self.tx.send_str(name).await
    }
}

fn too_long<T>(len: usize) -> io::Result<T> {
    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("length prefix {len} exceeds the limit of {MAX_PAYLOAD_LEN} bytes"),
    ))
}
