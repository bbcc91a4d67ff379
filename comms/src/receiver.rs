use std::io;

use bytemuck::Pod;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::{
    LEN_TYPE_SIZE, LenType, MAX_PAYLOAD_LEN, Tag,
    tag::TAG_SIZE,
    too_long,
};

/// The receiving end handle of the communication.
pub struct LinkReceiver<R: AsyncRead + Unpin> {
    rx: BufReader<R>,
}

impl<R: AsyncRead + Unpin> LinkReceiver<R> {
    /// Creates a new `LinkReceiver` instance.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx: BufReader::new(rx),
        }
    }

    /// Waits until there is inbound data, without consuming any of it.
    ///
    /// Dropping the returned future before it resolves loses no data.
    ///
    /// # Returns
    /// `Ok(true)` if data is ready, `Ok(false)` if the peer closed the link
    /// or `io::Error` on failure.
    pub async fn readable(&mut self) -> io::Result<bool> {
        let ready = self.rx.fill_buf().await?;
        Ok(!ready.is_empty())
    }

    /// Waits to receive a control tag.
    ///
    /// A tag outside the reserved set is reported as an `InvalidData` error.
    pub async fn recv_tag(&mut self) -> io::Result<Tag> {
        let mut tag_buf = [0; TAG_SIZE];
        self.rx.read_exact(&mut tag_buf).await?;
        Tag::from_be_bytes(tag_buf).map_err(io::Error::from)
    }

    /// Waits to receive a fixed-width value sent with `LinkSender::send_pod`.
    pub async fn recv_pod<T: Pod>(&mut self) -> io::Result<T> {
        let mut value = T::zeroed();
        self.rx.read_exact(bytemuck::bytes_of_mut(&mut value)).await?;
        Ok(value)
    }

    pub async fn recv_u64(&mut self) -> io::Result<u64> {
        self.recv_pod().await
    }

    pub async fn recv_f64(&mut self) -> io::Result<f64> {
        self.recv_pod().await
    }

    /// Waits to receive a vector of floats sent with `LinkSender::send_f64s`.
    ///
    /// # Returns
    /// A result object that returns the elements on success or `io::Error` on failure.
    pub async fn recv_f64s(&mut self) -> io::Result<Vec<f64>> {
        let count = self.recv_len().await?;
        let byte_len = count.saturating_mul(size_of::<f64>());
        if byte_len > MAX_PAYLOAD_LEN {
            return too_long(byte_len);
        }

        let mut values = vec![0f64; count];
        self.rx
            .read_exact(bytemuck::cast_slice_mut(&mut values))
            .await?;

        Ok(values)
    }

    /// Waits to receive a string sent with `LinkSender::send_str`.
    ///
    /// # Returns
    /// A result object that returns the text on success or `io::Error` on failure.
    pub async fn recv_string(&mut self) -> io::Result<String> {
        let len = self.recv_len().await?;
        if len > MAX_PAYLOAD_LEN {
            return too_long(len);
        }

        let mut bytes = vec![0; len];
        self.rx.read_exact(&mut bytes).await?;

        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn recv_len(&mut self) -> io::Result<usize> {
        let mut size_buf = [0; LEN_TYPE_SIZE];
        self.rx.read_exact(&mut size_buf).await?;
        let len = LenType::from_be_bytes(size_buf);
        usize::try_from(len).or_else(|_| too_long(usize::MAX))
    }
}
