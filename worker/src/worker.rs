use std::io;

use comms::{Link, Registry, Tag};
use log::{debug, info};
use montecarlo::Experiment;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Result, config::WorkerConfig, session::Session};

/// Serves estimation calls from a single master connection.
pub struct Worker<R, W, E>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    name: String,
    session: Session<R, W, E>,
    registry: Registry<Session<R, W, E>>,
}

impl<R, W, E> Worker<R, W, E>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    E: Experiment + 'static,
{
    /// Creates a worker over an established master connection.
    ///
    /// # Args
    /// * `rx` - Reading half of the connection.
    /// * `tx` - Writing half of the connection.
    /// * `config` - Name and work unit of this worker.
    ///
    /// # Returns
    /// A new worker instance, waiting for its first call.
    pub fn new(rx: R, tx: W, config: WorkerConfig) -> Self {
        Self {
            name: config.name().to_string(),
            session: Session::new(Link::new(rx, tx), config.work_unit()),
            registry: Session::registry(),
        }
    }

    /// Answers master requests until told to die or the master disconnects.
    ///
    /// # Returns
    /// Returns `Ok(())` on `Die` or when the master closes the connection
    /// between requests.
    ///
    /// # Errors
    /// Returns `WorkerErr` on I/O failures, unknown calls or calls made out of order.
    pub async fn run(mut self) -> Result<()> {
        info!("serving as {}", self.name);

        loop {
            let tag = match self.session.link.rx.recv_tag().await {
                Ok(tag) => tag,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    info!("master disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            match tag {
                Tag::GetName => self.session.link.tx.send_str(&self.name).await?,
                Tag::GetCpuTime => {
                    let busy = self.session.take_busy();
                    self.session.link.tx.send_f64(busy).await?;
                }
                Tag::Work => {
                    let name = self.session.link.rx.recv_string().await?;
                    debug!(call = name.as_str(); "invoking");
                    self.registry.invoke(&name, &mut self.session)?.await?;
                }
                Tag::Die => {
                    info!("master requested shutdown");
                    return Ok(());
                }
            }
        }
    }
}
