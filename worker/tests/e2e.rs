use std::{num::NonZeroUsize, time::Duration};

use montecarlo::{
    ChannelAcceptor, EstimatorConfig, Experiment, Interrupt, MonteCarlo, SlavePool, estimator,
    experiments::UncodedAwgn, pool::Connector, progress::Silent,
};
use tokio::{
    io::{self, DuplexStream, ReadHalf, WriteHalf},
    task::JoinHandle,
};
use worker::{Worker, WorkerConfig};

type Rx = ReadHalf<DuplexStream>;
type Tx = WriteHalf<DuplexStream>;

const BUF_SIZE: usize = 4096;
const WORK_UNIT: Duration = Duration::from_millis(20);
const RUN_LIMIT: Duration = Duration::from_secs(30);

fn spawn_worker(connector: &Connector<Rx, Tx>, name: &str) -> JoinHandle<worker::Result<()>> {
    let (master, slave) = io::duplex(BUF_SIZE);

    let (rx, tx) = io::split(master);
    connector.send((rx, tx, name.to_string())).unwrap();

    let (rx, tx) = io::split(slave);
    let worker = Worker::<_, _, UncodedAwgn>::new(rx, tx, WorkerConfig::new(name, WORK_UNIT));
    tokio::spawn(worker.run())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_workers_estimate_a_parameter_sweep() {
    let (connector, acceptor) = ChannelAcceptor::new();
    let mut pool = SlavePool::new(acceptor);
    let workers = [
        spawn_worker(&connector, "left"),
        spawn_worker(&connector, "right"),
    ];

    let system = UncodedAwgn::new(NonZeroUsize::new(100).unwrap());
    let mut mc = MonteCarlo::new(system, EstimatorConfig::default()).unwrap();

    let (interrupt, mut silent) = (Interrupt::new(), Silent);

    // Uncoded BPSK bit error rates are Q(sqrt(2 Eb/N0)).
    for (ebn0_db, ber) in [(0.0, 0.0786), (2.0, 0.0375)] {
        mc.experiment_mut().set_parameter(ebn0_db);

        let run = mc.estimate_distributed(&mut pool, &interrupt, &mut silent);
        let estimate = tokio::time::timeout(RUN_LIMIT, run)
            .await
            .expect("run did not converge")
            .unwrap();

        assert!(estimate.converged);
        assert!(estimate.samples >= 128);
        assert!(estimate.accuracy <= 0.10);

        let measured = estimate.result[UncodedAwgn::BER];
        assert!(
            (measured - ber).abs() < 0.2 * ber,
            "at {ebn0_db} dB: {measured} vs {ber}"
        );
    }

    assert_eq!(pool.len(), 2);
    assert!(pool.busy_time_used() > 0.0);

    estimator::settle(&mut pool, &interrupt).await;
    pool.shutdown().await;
    for worker in workers {
        assert!(worker.await.unwrap().is_ok());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_joining_between_runs_is_put_to_work() {
    let (connector, acceptor) = ChannelAcceptor::new();
    let mut pool = SlavePool::new(acceptor);

    let system = UncodedAwgn::new(NonZeroUsize::new(100).unwrap());
    let config = EstimatorConfig::new(0.05, 0.95).unwrap();
    let mut mc = MonteCarlo::new(system, config).unwrap();

    let early = spawn_worker(&connector, "early");
    let first = tokio::time::timeout(
        RUN_LIMIT,
        mc.estimate_distributed(&mut pool, &Interrupt::new(), &mut Silent),
    )
    .await
    .expect("first run did not converge")
    .unwrap();
    assert!(first.converged);
    assert_eq!(pool.len(), 1);

    let late = spawn_worker(&connector, "late");
    mc.experiment_mut().set_parameter(1.0);
    let second = tokio::time::timeout(
        RUN_LIMIT,
        mc.estimate_distributed(&mut pool, &Interrupt::new(), &mut Silent),
    )
    .await
    .expect("second run did not converge")
    .unwrap();

    assert!(second.converged);
    assert!(second.accuracy <= 0.05);
    assert!(second.result[UncodedAwgn::BER] < first.result[UncodedAwgn::BER]);
    assert_eq!(pool.len(), 2);

    estimator::settle(&mut pool, &Interrupt::new()).await;
    pool.shutdown().await;
    assert!(early.await.unwrap().is_ok());
    assert!(late.await.unwrap().is_ok());
}
