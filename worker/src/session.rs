//! The worker side of the estimation calls.

use std::{
    io,
    time::{Duration, Instant},
};

use comms::{Link, Registry};
use futures::{FutureExt, future::BoxFuture};
use log::{debug, info};
use montecarlo::{
    Digest, Experiment, RunningStats,
    protocol::{self, WorkResult},
};
use rand::{SeedableRng, rngs::StdRng};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::WorkerErr;

/// Everything the registered handlers work against.
pub(crate) struct Session<R, W, E>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) link: Link<R, W>,
    system: Option<(E, Digest)>,
    work_unit: Duration,
    busy: Duration,
}

impl<R, W, E> Session<R, W, E>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    E: Experiment + 'static,
{
    pub(crate) fn new(link: Link<R, W>, work_unit: Duration) -> Self {
        Self {
            link,
            system: None,
            work_unit,
            busy: Duration::ZERO,
        }
    }

    /// Wall time spent sampling since the previous call, in seconds.
    pub(crate) fn take_busy(&mut self) -> f64 {
        std::mem::take(&mut self.busy).as_secs_f64()
    }

    /// The calls a master may invoke on this worker.
    pub(crate) fn registry() -> Registry<Self> {
        let mut registry = Registry::new();
        registry.register(protocol::GET_CODE, get_code::<R, W, E>);
        registry.register(protocol::GET_SNR, get_snr::<R, W, E>);
        registry.register(protocol::WORK, work::<R, W, E>);
        registry
    }
}

/// Receives the system text and rebuilds the experiment from it.
fn get_code<R, W, E>(s: &mut Session<R, W, E>) -> BoxFuture<'_, io::Result<()>>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
    E: Experiment,
{
    async move {
        let text = s.link.rx.recv_string().await?;
        let experiment = E::from_text(&text).map_err(WorkerErr::InvalidExperiment)?;
        let digest = Digest::of(text.as_bytes());

        info!("received system {digest}: {}", experiment.description());
        s.system = Some((experiment, digest));
        Ok(())
    }
    .boxed()
}

/// Reseeds the experiment and receives its operating parameter.
fn get_snr<R, W, E>(s: &mut Session<R, W, E>) -> BoxFuture<'_, io::Result<()>>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
    E: Experiment,
{
    async move {
        let (experiment, _) = s.system.as_mut().ok_or(WorkerErr::NotInitialized {
            call: protocol::GET_SNR,
        })?;

        experiment.seed_from(&mut StdRng::from_os_rng());
        let parameter = s.link.rx.recv_f64().await?;
        experiment.set_parameter(parameter);

        debug!(parameter = parameter; "parameter set");
        Ok(())
    }
    .boxed()
}

/// Samples for one work unit and replies with the partial totals.
fn work<R, W, E>(s: &mut Session<R, W, E>) -> BoxFuture<'_, io::Result<()>>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
    E: Experiment + 'static,
{
    async move {
        let (experiment, digest) = s.system.take().ok_or(WorkerErr::NotInitialized {
            call: protocol::WORK,
        })?;

        let work_unit = s.work_unit;
        let (experiment, stats, busy) =
            tokio::task::spawn_blocking(move || sample_for(experiment, work_unit))
                .await
                .map_err(io::Error::other)?;

        s.busy += busy;
        debug!(samples = stats.samples(); "work unit done");

        let result = WorkResult::new(&digest, experiment.parameter(), &stats);
        s.system = Some((experiment, digest));
        result.send(&mut s.link.tx).await
    }
    .boxed()
}

/// Draws samples until `work_unit` has elapsed, always at least one.
fn sample_for<E: Experiment>(mut experiment: E, work_unit: Duration) -> (E, RunningStats, Duration) {
    let started = Instant::now();
    let mut stats = RunningStats::new(experiment.count());
    let mut sample = vec![0.0; experiment.count()];

    loop {
        experiment.sample(&mut sample);
        stats.accumulate(&sample);

        if started.elapsed() >= work_unit {
            break;
        }
    }

    (experiment, stats, started.elapsed())
}
