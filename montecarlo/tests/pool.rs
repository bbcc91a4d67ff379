use std::{io, time::Duration};

use comms::{Link, Tag};
use montecarlo::{
    ChannelAcceptor, SlavePool,
    pool::{Connector, Event, SlaveState},
};
use tokio::{
    io::{DuplexStream, ReadHalf, WriteHalf},
    task::JoinHandle,
};

type Rx = ReadHalf<DuplexStream>;
type Tx = WriteHalf<DuplexStream>;
type Pool = SlavePool<ChannelAcceptor<Rx, Tx>>;

const WAIT: Duration = Duration::from_millis(500);

/// Hands a new connection to the pool and returns the slave side of it.
fn connect(connector: &Connector<Rx, Tx>, peer: &str) -> Link<Rx, Tx> {
    let (master, slave) = tokio::io::duplex(1024);
    let (rx, tx) = tokio::io::split(master);
    connector.send((rx, tx, peer.to_string())).unwrap();

    let (rx, tx) = tokio::io::split(slave);
    Link::new(rx, tx)
}

/// Answers the name query the pool sends to every new connection.
fn answer_name(mut slave: Link<Rx, Tx>, name: &'static str) -> JoinHandle<Link<Rx, Tx>> {
    tokio::spawn(async move {
        assert_eq!(slave.rx.recv_tag().await.unwrap(), Tag::GetName);
        slave.tx.send_str(name).await.unwrap();
        slave
    })
}

async fn join(pool: &mut Pool, connector: &Connector<Rx, Tx>, name: &'static str) -> Link<Rx, Tx> {
    let answering = answer_name(connect(connector, "peer"), name);

    let Event::Connected(id) = pool.wait_for_event(true, WAIT).await else {
        panic!("{name} did not join");
    };
    assert_eq!(pool.name(id), Some(name));
    assert_eq!(pool.state(id), Some(SlaveState::New));

    answering.await.unwrap()
}

#[tokio::test]
async fn accepted_slaves_start_new() {
    let (connector, acceptor) = ChannelAcceptor::new();
    let mut pool = SlavePool::new(acceptor);

    let _a = join(&mut pool, &connector, "alpha").await;
    let _b = join(&mut pool, &connector, "beta").await;

    assert_eq!(pool.len(), 2);
    assert!(pool.find_new().is_some());
    assert!(pool.find_idle().is_none());
    assert!(!pool.any_working());
}

#[tokio::test]
async fn no_connections_are_taken_unless_asked() {
    let (connector, acceptor) = ChannelAcceptor::new();
    let mut pool = SlavePool::new(acceptor);

    let _pending = answer_name(connect(&connector, "peer"), "late");

    assert_eq!(
        pool.wait_for_event(false, Duration::from_millis(50)).await,
        Event::Timeout
    );
    assert!(pool.is_empty());

    assert!(matches!(
        pool.wait_for_event(true, WAIT).await,
        Event::Connected(_)
    ));
}

#[tokio::test]
async fn silent_connection_is_turned_away_in_time() {
    let (connector, acceptor) = ChannelAcceptor::new();
    let mut pool = SlavePool::new(acceptor);

    // Stays open but never answers the name query.
    let _silent = connect(&connector, "silent");

    let event = tokio::time::timeout(3 * WAIT, pool.wait_for_event(true, WAIT))
        .await
        .expect("waiting on a silent connection did not time out");

    assert_eq!(event, Event::Timeout);
    assert!(pool.is_empty());

    // A well-behaved slave still gets in afterwards.
    let _ok = join(&mut pool, &connector, "talkative").await;
    assert_eq!(pool.len(), 1);
}

#[tokio::test]
async fn state_cycle_follows_the_work() {
    let (connector, acceptor) = ChannelAcceptor::new();
    let mut pool = SlavePool::new(acceptor);
    let mut slave = join(&mut pool, &connector, "worker").await;
    let id = pool.find_new().unwrap();

    pool.mark_idle(id);
    assert_eq!(pool.find_idle(), Some(id));

    pool.mark_working(id);
    assert_eq!(pool.count_working(), 1);

    // Nothing to read yet.
    assert_eq!(
        pool.wait_for_event(false, Duration::from_millis(50)).await,
        Event::Timeout
    );
    assert_eq!(pool.state(id), Some(SlaveState::Working));

    slave.tx.send_u64(42).await.unwrap();
    assert_eq!(pool.wait_for_event(false, WAIT).await, Event::Readable);
    assert_eq!(pool.find_pending(), Some(id));

    let link = pool.link(id).unwrap();
    assert_eq!(link.rx.recv_u64().await.unwrap(), 42);

    pool.mark_idle(id);
    assert_eq!(pool.state(id), Some(SlaveState::Idle));

    pool.reset(id);
    assert_eq!(pool.state(id), Some(SlaveState::New));
}

#[tokio::test]
async fn reset_all_keeps_the_connections() {
    let (connector, acceptor) = ChannelAcceptor::new();
    let mut pool = SlavePool::new(acceptor);
    let _a = join(&mut pool, &connector, "a").await;
    let _b = join(&mut pool, &connector, "b").await;

    let ids: Vec<_> = pool.ids().collect();
    pool.mark_idle(ids[0]);
    pool.mark_idle(ids[1]);
    pool.mark_working(ids[1]);

    pool.reset_all();

    assert_eq!(pool.len(), 2);
    assert!(ids.iter().all(|&id| pool.state(id) == Some(SlaveState::New)));
}

#[tokio::test]
async fn closed_links_are_dropped() {
    let (connector, acceptor) = ChannelAcceptor::new();
    let mut pool = SlavePool::new(acceptor);
    let slave = join(&mut pool, &connector, "leaving").await;
    let _stays = join(&mut pool, &connector, "staying").await;

    drop(slave);
    pool.wait_for_event(false, WAIT).await;

    assert_eq!(pool.len(), 1);
    let id = pool.ids().next().unwrap();
    assert_eq!(pool.name(id), Some("staying"));
}

#[tokio::test]
async fn explicit_drop_forgets_the_slave() {
    let (connector, acceptor) = ChannelAcceptor::new();
    let mut pool = SlavePool::new(acceptor);
    let _slave = join(&mut pool, &connector, "broken").await;
    let id = pool.find_new().unwrap();

    pool.drop_slave(id, &io::ErrorKind::BrokenPipe.into());

    assert!(pool.is_empty());
    assert_eq!(pool.state(id), None);
    assert!(pool.link(id).is_none());
}

#[tokio::test]
async fn busy_time_accumulates_until_reset() {
    let (connector, acceptor) = ChannelAcceptor::new();
    let mut pool = SlavePool::new(acceptor);
    let mut slave = join(&mut pool, &connector, "busy").await;
    let id = pool.find_new().unwrap();

    let answering = tokio::spawn(async move {
        for used in [1.5, 0.25] {
            assert_eq!(slave.rx.recv_tag().await.unwrap(), Tag::GetCpuTime);
            slave.tx.send_f64(used).await.unwrap();
        }
    });

    assert_eq!(pool.update_busy_time(id).await.unwrap(), 1.5);
    assert_eq!(pool.update_busy_time(id).await.unwrap(), 0.25);
    answering.await.unwrap();

    assert_eq!(pool.busy_time_used(), 1.75);
    pool.reset_busy_time();
    assert_eq!(pool.busy_time_used(), 0.0);
    assert_eq!(pool.busy_time(id), Some(1.75));
}

#[tokio::test]
async fn shutdown_tells_every_slave_to_die() {
    let (connector, acceptor) = ChannelAcceptor::new();
    let mut pool = SlavePool::new(acceptor);
    let mut a = join(&mut pool, &connector, "a").await;
    let mut b = join(&mut pool, &connector, "b").await;

    pool.shutdown().await;

    assert!(pool.is_empty());
    assert_eq!(a.rx.recv_tag().await.unwrap(), Tag::Die);
    assert_eq!(b.rx.recv_tag().await.unwrap(), Tag::Die);
}
