//! The implementation of the sending end of the link protocol.

use std::io;

use bytemuck::Pod;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LenType, MAX_PAYLOAD_LEN, Tag, too_long};

/// Bodies up to this size travel in the same write as their header.
const INLINE_LIMIT: usize = 512;

/// The sending end handle of the communication.
pub struct LinkSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> LinkSender<W> {
    /// Creates a new `LinkSender` instance.
    ///
    /// # Arguments
    /// * `tx` - The underlying writer.
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            buf: Vec::new(),
        }
    }

    /// Sends a control tag.
    pub async fn send_tag(&mut self, tag: Tag) -> io::Result<()> {
        self.write_frame(&tag.to_be_bytes(), None).await
    }

    /// Sends a fixed-width value using its in-memory representation.
    ///
    /// No byte order conversion is performed, both ends must agree on it.
    ///
    /// # Arguments
    /// * `value` - Any plain-old-data value.
    ///
    /// # Returns
    /// A result object that returns `io::Error` on failure.
    pub async fn send_pod<T: Pod>(&mut self, value: &T) -> io::Result<()> {
        self.write_frame(bytemuck::bytes_of(value), None).await
    }

    pub async fn send_u64(&mut self, value: u64) -> io::Result<()> {
        self.send_pod(&value).await
    }

    pub async fn send_f64(&mut self, value: f64) -> io::Result<()> {
        self.send_pod(&value).await
    }

    /// Sends a vector of floats, prefixed by its element count.
    ///
    /// # Arguments
    /// * `values` - The elements to send.
    ///
    /// # Returns
    /// A result object that returns `io::Error` on failure.
    pub async fn send_f64s(&mut self, values: &[f64]) -> io::Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        if bytes.len() > MAX_PAYLOAD_LEN {
            return too_long(bytes.len());
        }

        let header = (values.len() as LenType).to_be_bytes();
        self.write_frame(&header, Some(bytes)).await
    }

    /// Sends a string, prefixed by its length in bytes.
    ///
    /// # Arguments
    /// * `s` - The text to send.
    ///
    /// # Returns
    /// A result object that returns `io::Error` on failure.
    pub async fn send_str(&mut self, s: &str) -> io::Result<()> {
        if s.len() > MAX_PAYLOAD_LEN {
            return too_long(s.len());
        }

        let header = (s.len() as LenType).to_be_bytes();
        self.write_frame(&header, Some(s.as_bytes())).await
    }

    /// Writes `head` and the optional zero copy `data` in one go and flushes.
    async fn write_frame(&mut self, head: &[u8], data: Option<&[u8]>) -> io::Result<()> {
        let Self { buf, tx } = self;

        buf.clear();
        buf.extend_from_slice(head);

        let data = match data {
            Some(data) if data.len() <= INLINE_LIMIT => {
                buf.extend_from_slice(data);
                None
            }
            other => other,
        };

        tx.write_all(buf).await?;

        if let Some(data) = data {
            tx.write_all(data).await?;
        }

        tx.flush().await
    }
}
