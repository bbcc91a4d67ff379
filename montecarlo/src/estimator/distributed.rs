use std::{io, time::Duration, time::Instant};

use comms::Link;
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use super::MonteCarlo;
use crate::{
    digest::Digest,
    error::Result,
    experiment::Experiment,
    interrupt::Interrupt,
    pool::{Acceptor, SlavePool, SlaveState},
    progress::{Progress, Report},
    protocol::{self, WorkResult},
    stats::{Estimate, RunningStats},
};

/// Longest a master pass waits for slave activity, so interrupts are seen promptly.
pub const PASS_TIMEOUT: Duration = Duration::from_millis(500);

/// What every slave must be running for its results to count.
struct Run {
    system: String,
    digest: Digest,
    parameter: f64,
}

impl Run {
    fn new<E: Experiment>(experiment: &E) -> Self {
        let system = experiment.to_text();
        let digest = Digest::of(system.as_bytes());

        Self {
            system,
            digest,
            parameter: experiment.parameter(),
        }
    }
}

impl<E: Experiment> MonteCarlo<E> {
    /// Distributes sampling over the slaves of `pool` until convergence or interrupt.
    ///
    /// Every slave is reset and reinitialized with the current system and
    /// parameter first. Slaves may join or leave at any time during the run.
    ///
    /// # Args
    /// * `pool` - The slave connections, kept across runs.
    /// * `interrupt` - Polled once per pass, stops the run when raised.
    /// * `progress` - Receives a report after every pass that produced results.
    ///
    /// # Returns
    /// The estimate reached, with `converged` unset if the run was interrupted.
    ///
    /// # Errors
    /// Returns `EstimatorErr::EmptyResult` if the experiment has no result dimensions.
    pub async fn estimate_distributed<A: Acceptor>(
        &mut self,
        pool: &mut SlavePool<A>,
        interrupt: &Interrupt,
        progress: &mut dyn Progress,
    ) -> Result<Estimate> {
        self.start_run()?;
        let started = Instant::now();

        let run = Run::new(&self.experiment);
        info!("system digest {}", run.digest);

        settle(pool, interrupt).await;
        pool.reset_all();
        pool.reset_busy_time();

        let mut estimate = self.evaluate();
        let mut pass = 0u64;

        loop {
            pass += 1;
            init_new_slaves(pool, &run).await;

            // Every idle slave gets work while not converged, even if some of
            // it ends up discarded. A stuck slave never holds up the run.
            if !estimate.converged {
                work_idle_slaves(pool).await;
            }

            debug!("pass {pass}: waiting for event");
            pool.wait_for_event(true, PASS_TIMEOUT).await;

            if read_pending_slaves(pool, &run, &mut self.stats).await {
                estimate = self.evaluate();

                let wall = started.elapsed().as_secs_f64();
                progress.report(&Report {
                    samples: estimate.samples,
                    accuracy_pct: Report::percent(estimate.accuracy),
                    mean: estimate.worst_mean(),
                    slaves: Some(pool.len()),
                    speedup: Some(if wall > 0.0 { pool.busy_time_used() / wall } else { 0.0 }),
                });
            }

            if estimate.converged {
                info!("converged after {} samples, {pass} passes", estimate.samples);
                break;
            }

            if interrupt.is_raised() {
                warn!("interrupted after {} samples, {pass} passes", estimate.samples);
                break;
            }
        }

        Ok(estimate)
    }
}

/// Longest `settle` waits for outstanding results. Must exceed the slaves' work unit.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Waits for the results still owed by working slaves, and discards them.
///
/// A slave reset while working would answer its next request with a stale
/// result, so every link must be quiet before the pool is reset or shut down.
/// Slaves still working after `SETTLE_TIMEOUT`, or when `interrupt` is raised,
/// are dropped.
pub async fn settle<A: Acceptor>(pool: &mut SlavePool<A>, interrupt: &Interrupt) {
    let deadline = Instant::now() + SETTLE_TIMEOUT;

    while pool.any_working() {
        let now = Instant::now();
        if interrupt.is_raised() {
            drop_working(pool, io::ErrorKind::Interrupted, "interrupted while working");
            return;
        }
        if now >= deadline {
            drop_working(pool, io::ErrorKind::TimedOut, "no result in time");
            return;
        }

        debug!("waiting on {} working slaves", pool.count_working());
        pool.wait_for_event(false, PASS_TIMEOUT.min(deadline - now)).await;

        while let Some(id) = pool.find_pending() {
            let Some(link) = pool.link(id) else {
                break;
            };

            let settled = match WorkResult::recv(&mut link.rx).await {
                Ok(_) => pool.update_busy_time(id).await.map(drop),
                Err(e) => Err(e),
            };

            match settled {
                Ok(()) => pool.mark_idle(id),
                Err(e) => pool.drop_slave(id, &e),
            }
        }
    }
}

fn drop_working<A: Acceptor>(pool: &mut SlavePool<A>, kind: io::ErrorKind, why: &str) {
    let working: Vec<_> = pool
        .ids()
        .filter(|&id| pool.state(id) == Some(SlaveState::Working))
        .collect();

    let reason = io::Error::new(kind, why);
    for id in working {
        pool.drop_slave(id, &reason);
    }
}

/// Sends the system and parameter to every slave in the `New` state.
async fn init_new_slaves<A: Acceptor>(pool: &mut SlavePool<A>, run: &Run) {
    while let Some(id) = pool.find_new() {
        let Some(link) = pool.link(id) else {
            break;
        };

        debug!("new slave {id}, initializing");
        match init_slave(link, run).await {
            Ok(()) => pool.mark_idle(id),
            Err(e) => pool.drop_slave(id, &e),
        }
    }
}

async fn init_slave<R, W>(link: &mut Link<R, W>, run: &Run) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    link.call(protocol::GET_CODE).await?;
    link.tx.send_str(&run.system).await?;
    link.call(protocol::GET_SNR).await?;
    link.tx.send_f64(run.parameter).await
}

/// Hands a work unit to every slave in the `Idle` state.
async fn work_idle_slaves<A: Acceptor>(pool: &mut SlavePool<A>) {
    while let Some(id) = pool.find_idle() {
        let Some(link) = pool.link(id) else {
            break;
        };

        debug!("idle slave {id}, assigning work");
        match link.call(protocol::WORK).await {
            Ok(()) => pool.mark_working(id),
            Err(e) => pool.drop_slave(id, &e),
        }
    }
}

/// Reads the results of every slave in the `EventPending` state.
///
/// Results computed for another system or parameter are discarded and their
/// slave reset to `New`, to be reinitialized on the next pass.
///
/// # Returns
/// Whether any results were added to `stats`.
async fn read_pending_slaves<A: Acceptor>(
    pool: &mut SlavePool<A>,
    run: &Run,
    stats: &mut RunningStats,
) -> bool {
    let mut results_available = false;

    while let Some(id) = pool.find_pending() {
        let Some(link) = pool.link(id) else {
            break;
        };

        let result = match WorkResult::recv(&mut link.rx).await {
            Ok(result) => result,
            Err(e) => {
                pool.drop_slave(id, &e);
                continue;
            }
        };

        if !result.matches(&run.digest, run.parameter) {
            warn!("slave {id} returned results for another system, reinitializing");
            pool.reset(id);
            continue;
        }

        if !stats.merge(&result.sum, &result.sum_sq, result.samples) {
            warn!(
                "slave {id} returned {} results, expected {}, reinitializing",
                result.sum.len(),
                stats.count()
            );
            pool.reset(id);
            continue;
        }

        results_available = true;
        debug!("read {} samples from slave {id}", result.samples);

        match pool.update_busy_time(id).await {
            Ok(_) => pool.mark_idle(id),
            Err(e) => pool.drop_slave(id, &e),
        }
    }

    results_available
}
