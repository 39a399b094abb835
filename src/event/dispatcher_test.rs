use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::unbounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

use super::*;
use crate::DispatchConfig;
use crate::DispatchError;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
enum PingType {
    Ping,
}

#[derive(Debug)]
struct Ping {
    seq: u32,
}

impl Event for Ping {
    type Type = PingType;
    type Subject = u32;

    fn event_type(&self) -> PingType {
        PingType::Ping
    }

    fn subject(&self) -> &u32 {
        &self.seq
    }

    fn time(&self) -> u64 {
        0
    }
}

type Pong = StoreEvent<PingType, &'static str>;

struct RecordingSink {
    tx: Sender<u32>,
    /// Sequence number on which the sink blocks once
    stall_on: Option<u32>,
    stall_for: Duration,
    stalled: AtomicBool,
    limit_hits: AtomicUsize,
}

impl RecordingSink {
    fn new() -> (Arc<Self>, Receiver<u32>) {
        Self::stalling(None, Duration::ZERO)
    }

    fn stalling(
        stall_on: Option<u32>,
        stall_for: Duration,
    ) -> (Arc<Self>, Receiver<u32>) {
        let (tx, rx) = unbounded();
        let sink = Arc::new(Self {
            tx,
            stall_on,
            stall_for,
            stalled: AtomicBool::new(false),
            limit_hits: AtomicUsize::new(0),
        });
        (sink, rx)
    }
}

impl EventSink<Ping> for RecordingSink {
    fn process(
        &self,
        event: &Ping,
        _cancel: &CancellationToken,
    ) -> crate::Result<()> {
        if self.stall_on == Some(event.seq) && !self.stalled.swap(true, std::sync::atomic::Ordering::SeqCst) {
            std::thread::sleep(self.stall_for);
        }
        let _ = self.tx.send(event.seq);
        Ok(())
    }

    fn on_process_limit(&self) {
        self.limit_hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

struct PongSink {
    tx: Sender<&'static str>,
}

impl EventSink<Pong> for PongSink {
    fn process(
        &self,
        event: &Pong,
        _cancel: &CancellationToken,
    ) -> crate::Result<()> {
        let _ = self.tx.send(*event.subject());
        Ok(())
    }
}

struct FlakySink {
    tx: Sender<u32>,
}

impl EventSink<Ping> for FlakySink {
    fn process(
        &self,
        event: &Ping,
        _cancel: &CancellationToken,
    ) -> crate::Result<()> {
        match event.seq {
            1 => Err(DispatchError::SinkFailed {
                event_type: "Ping",
                reason: "boom".to_string(),
            }
            .into()),
            2 => panic!("sink panic"),
            seq => {
                let _ = self.tx.send(seq);
                Ok(())
            }
        }
    }
}

fn fast_config() -> DispatchConfig {
    DispatchConfig {
        watchdog_interval_ms: 20,
        max_process_ms: 100,
        queue_capacity: 0,
    }
}

const WAIT: Duration = Duration::from_secs(3);

/// # Case 1: events from one producer arrive in post order
#[test]
fn test_fifo_delivery() {
    let dispatcher = EventDispatcher::new(fast_config());
    let (sink, rx) = RecordingSink::new();
    dispatcher.add_sink::<Ping, _>(sink);
    dispatcher.start().unwrap();

    for seq in 0..100 {
        dispatcher.post(Ping { seq }).unwrap();
    }

    let received: Vec<u32> = (0..100).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
    assert_eq!(received, (0..100).collect::<Vec<_>>());

    dispatcher.stop();
    assert_eq!(dispatcher.stats().delivered, 100);
}

/// # Case 2: events posted before start are delivered once started
#[test]
fn test_events_posted_before_start_are_delivered() {
    let dispatcher = EventDispatcher::new(fast_config());
    let (sink, rx) = RecordingSink::new();
    dispatcher.add_sink::<Ping, _>(sink);

    dispatcher.post(Ping { seq: 7 }).unwrap();
    assert_eq!(dispatcher.stats().queued, 1);

    dispatcher.start().unwrap();
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 7);
    dispatcher.stop();
}

/// # Case 3: an event without a sink is dropped and does not block later ones
#[test]
fn test_missing_sink_does_not_block_delivery() {
    let dispatcher = EventDispatcher::new(fast_config());
    let (sink, rx) = RecordingSink::new();
    dispatcher.start().unwrap();

    assert!(dispatcher.post(Pong::new(PingType::Ping, "lost")).is_ok());
    dispatcher.add_sink::<Ping, _>(sink);
    dispatcher.post(Ping { seq: 1 }).unwrap();

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
    // Counters are bumped after the sink returns; stop() joins the loop
    dispatcher.stop();
    let stats = dispatcher.stats();
    assert_eq!(stats.unhandled, 1);
    assert_eq!(stats.delivered, 1);
}

/// # Case 4: registering a second sink for a type replaces the first
#[test]
fn test_last_sink_registration_wins() {
    let dispatcher = EventDispatcher::new(fast_config());
    let (first, first_rx) = RecordingSink::new();
    let (second, second_rx) = RecordingSink::new();
    dispatcher.add_sink::<Ping, _>(first);
    dispatcher.add_sink::<Ping, _>(second);
    assert_eq!(dispatcher.sinks().len(), 1);

    dispatcher.start().unwrap();
    dispatcher.post(Ping { seq: 3 }).unwrap();

    assert_eq!(second_rx.recv_timeout(WAIT).unwrap(), 3);
    assert!(first_rx.try_recv().is_err());
    dispatcher.stop();
}

/// # Case 5: sink errors and panics are counted and the loop carries on
#[test]
fn test_sink_failures_do_not_stop_the_loop() {
    let dispatcher = EventDispatcher::new(fast_config());
    let (tx, rx) = unbounded();
    dispatcher.add_sink::<Ping, _>(Arc::new(FlakySink { tx }));
    dispatcher.start().unwrap();

    for seq in 1..=3 {
        dispatcher.post(Ping { seq }).unwrap();
    }

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 3);
    dispatcher.stop();
    let stats = dispatcher.stats();
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.respawns, 0);
}

/// # Case 6: a sink stuck past the limit gets the loop replaced
#[test]
fn test_watchdog_respawns_loop_for_stuck_sink() {
    let dispatcher = EventDispatcher::new(fast_config());
    let (sink, rx) = RecordingSink::stalling(Some(1), Duration::from_millis(1500));
    dispatcher.add_sink::<Ping, _>(sink.clone());
    dispatcher.start().unwrap();

    dispatcher.post(Ping { seq: 1 }).unwrap();
    dispatcher.post(Ping { seq: 2 }).unwrap();

    // The replacement loop delivers 2 while 1 is still stuck
    assert_eq!(rx.recv_timeout(Duration::from_millis(1200)).unwrap(), 2);
    assert_eq!(dispatcher.stats().respawns, 1);
    assert_eq!(sink.limit_hits.load(std::sync::atomic::Ordering::SeqCst), 1);

    // The abandoned loop finishes its event and exits without stealing more
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
    dispatcher.post(Ping { seq: 3 }).unwrap();
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 3);
    dispatcher.stop();
}

/// # Case 7: a disabled watchdog lets slow sinks run to completion
#[test]
fn test_disabled_watchdog_never_respawns() {
    let dispatcher = EventDispatcher::new(DispatchConfig {
        max_process_ms: 0,
        ..fast_config()
    });
    let (sink, rx) = RecordingSink::stalling(Some(1), Duration::from_millis(300));
    dispatcher.add_sink::<Ping, _>(sink);
    dispatcher.start().unwrap();

    dispatcher.post(Ping { seq: 1 }).unwrap();
    dispatcher.post(Ping { seq: 2 }).unwrap();

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 2);
    assert_eq!(dispatcher.stats().respawns, 0);
    dispatcher.stop();
}

/// # Case 8: stop is idempotent and later posts fail loudly
#[test]
#[traced_test]
fn test_stop_is_idempotent_and_rejects_posts() {
    let dispatcher = EventDispatcher::new(fast_config());
    dispatcher.start().unwrap();
    dispatcher.start().unwrap();
    assert!(dispatcher.is_running());

    dispatcher.stop();
    dispatcher.stop();
    assert!(!dispatcher.is_running());

    let result = dispatcher.post(Ping { seq: 1 });
    assert!(matches!(result, Err(Error::Dispatch(DispatchError::NotRunning { .. }))));
    assert_eq!(dispatcher.stats().rejected, 1);
    assert!(logs_contain("Event posted to stopped dispatcher"));

    assert!(matches!(dispatcher.start(), Err(Error::Dispatch(DispatchError::Stopped))));
}

/// # Case 9: a full bounded queue rejects the post
#[test]
fn test_bounded_queue_rejects_when_full() {
    let dispatcher = EventDispatcher::new(DispatchConfig {
        queue_capacity: 1,
        ..fast_config()
    });

    dispatcher.post(Ping { seq: 1 }).unwrap();
    let result = dispatcher.post(Ping { seq: 2 });
    assert!(matches!(
        result,
        Err(Error::Dispatch(DispatchError::QueueFull { capacity: 1, .. }))
    ));

    let stats = dispatcher.stats();
    assert_eq!(stats.posted, 1);
    assert_eq!(stats.rejected, 1);
}

/// # Case 10: sinks are keyed by concrete event type
#[test]
fn test_sinks_are_keyed_by_event_type() {
    let dispatcher = EventDispatcher::new(fast_config());
    let (ping_sink, ping_rx) = RecordingSink::new();
    let (tx, pong_rx) = unbounded();
    dispatcher.add_sink::<Ping, _>(ping_sink);
    dispatcher.add_sink::<Pong, _>(Arc::new(PongSink { tx }));
    assert_eq!(dispatcher.sinks().len(), 2);

    dispatcher.start().unwrap();
    dispatcher.post(Pong::new(PingType::Ping, "pong")).unwrap();
    dispatcher.post(Ping { seq: 9 }).unwrap();

    assert_eq!(pong_rx.recv_timeout(WAIT).unwrap(), "pong");
    assert_eq!(ping_rx.recv_timeout(WAIT).unwrap(), 9);

    assert!(dispatcher.remove_sink::<Pong>());
    assert!(!dispatcher.remove_sink::<Pong>());
    assert_eq!(dispatcher.sinks().len(), 1);
    dispatcher.stop();
}

#[test]
fn test_metrics_register_into_registry() {
    let dispatcher = EventDispatcher::new(fast_config());
    let registry = prometheus::Registry::new();
    dispatcher.register_metrics(&registry).unwrap();

    dispatcher.post(Ping { seq: 1 }).unwrap();
    let text = crate::encode_text(&registry);
    assert!(text.contains("topocore_dispatch_posted_total 1"));
}
