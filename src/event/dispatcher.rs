//! Event queue, dispatch loop and watchdog.
//!
//! ```text
//! post() -> try_send(queue) ─┐
//!                            ↓
//! Dispatch loop thread:  queue.recv() -> sinks[TypeId] -> process()
//!                            ↑
//! Watchdog thread:       every interval, if process() overran the limit:
//!                        cancel loop token -> on_process_limit() -> spawn new loop
//! ```
//!
//! The stuck loop thread is abandoned rather than interrupted. It exits on its
//! own once the sink returns, because its token is cancelled.

use std::any::Any;
use std::any::TypeId;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;
use dashmap::DashMap;
use parking_lot::Mutex;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::sink::ErasedSink;
use super::sink::SinkAdapter;
use super::Event;
use super::EventSink;
use crate::DispatchConfig;
use crate::DispatchError;
use crate::DispatchMetrics;
use crate::Result;

/// How long `stop()` waits for the live loop to drain up to the kill marker.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

enum Envelope {
    Event {
        type_id: TypeId,
        type_name: &'static str,
        payload: Box<dyn Any + Send>,
    },
    /// Poison pill posted by `stop()`
    Kill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatcherState {
    Created,
    Running,
    Stopped,
}

struct SinkEntry {
    type_name: &'static str,
    sink: Arc<dyn ErasedSink>,
}

/// What the loop is doing right now, shared with the watchdog.
#[derive(Default)]
struct LoopProgress {
    started: Option<Instant>,
    type_name: &'static str,
    sink: Option<Arc<dyn ErasedSink>>,
}

struct DispatchLoop {
    id: u64,
    cancel: CancellationToken,
    progress: Mutex<LoopProgress>,
    /// Disconnects when the loop thread exits
    done: Receiver<()>,
}

/// Snapshot of the dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub posted: u64,
    pub delivered: u64,
    pub unhandled: u64,
    pub failed: u64,
    pub rejected: u64,
    pub respawns: u64,
    pub queued: usize,
}

struct DispatcherInner {
    config: DispatchConfig,
    sinks: DashMap<TypeId, SinkEntry>,
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
    state: Mutex<DispatcherState>,
    current: ArcSwapOption<DispatchLoop>,
    watchdog: Mutex<Option<(Sender<()>, JoinHandle<()>)>>,
    next_loop_id: AtomicU64,
    metrics: DispatchMetrics,
}

impl std::fmt::Debug for DispatcherInner {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DispatcherInner")
            .field("config", &self.config)
            .field("sinks", &self.sinks.len())
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

/// Single-consumer, multi-producer event dispatcher.
///
/// Cheap to clone; clones share the same queue, sinks and loop.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    inner: Arc<DispatcherInner>,
}

impl EventDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        let (tx, rx) = if config.queue_capacity > 0 {
            bounded(config.queue_capacity)
        } else {
            unbounded()
        };

        Self {
            inner: Arc::new(DispatcherInner {
                config,
                sinks: DashMap::new(),
                tx,
                rx,
                state: Mutex::new(DispatcherState::Created),
                current: ArcSwapOption::empty(),
                watchdog: Mutex::new(None),
                next_loop_id: AtomicU64::new(1),
                metrics: DispatchMetrics::new(),
            }),
        }
    }

    /// Starts the dispatch loop and, unless disabled, the watchdog.
    ///
    /// Calling `start()` on a running dispatcher is a no-op. Events posted
    /// before `start()` are delivered once the loop is up.
    pub fn start(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        match *state {
            DispatcherState::Running => return Ok(()),
            DispatcherState::Stopped => return Err(DispatchError::Stopped.into()),
            DispatcherState::Created => {}
        }

        DispatcherInner::spawn_loop(&self.inner)?;

        if let Some(limit) = self.inner.config.max_process_time() {
            let (shutdown_tx, shutdown_rx) = bounded(1);
            let inner = self.inner.clone();
            let interval = self.inner.config.watchdog_interval();
            let handle = std::thread::Builder::new()
                .name("event-watchdog".to_string())
                .spawn(move || run_watchdog(inner, shutdown_rx, interval, limit))
                .map_err(|source| DispatchError::Spawn {
                    name: "event-watchdog".to_string(),
                    source,
                })?;
            *self.inner.watchdog.lock() = Some((shutdown_tx, handle));
        }

        *state = DispatcherState::Running;
        info!(
            max_process_ms = self.inner.config.max_process_ms,
            queue_capacity = self.inner.config.queue_capacity,
            "Event dispatcher started"
        );
        Ok(())
    }

    /// Stops the watchdog, then the dispatch loop.
    ///
    /// Idempotent. Events queued ahead of the kill marker are still delivered.
    pub fn stop(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state == DispatcherState::Stopped {
                return;
            }
            *state = DispatcherState::Stopped;
        }

        // Watchdog first so it cannot respawn a loop we are about to kill
        if let Some((shutdown_tx, handle)) = self.inner.watchdog.lock().take() {
            let _ = shutdown_tx.send(());
            if handle.join().is_err() {
                error!("Event watchdog thread panicked");
            }
        }

        let Some(current) = self.inner.current.swap(None) else {
            debug!("Event dispatcher stopped before start");
            return;
        };

        if self.inner.tx.send_timeout(Envelope::Kill, STOP_TIMEOUT).is_err() {
            warn!("Could not enqueue kill marker; abandoning dispatch loop");
            current.cancel.cancel();
            return;
        }

        match current.done.recv_timeout(STOP_TIMEOUT) {
            Err(RecvTimeoutError::Disconnected) | Ok(()) => {
                info!(loop_id = current.id, "Event dispatcher stopped");
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(loop_id = current.id, "Dispatch loop did not exit in time; abandoning it");
                current.cancel.cancel();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        *self.inner.state.lock() == DispatcherState::Running
    }

    /// Enqueues `event` without blocking.
    ///
    /// Fails loudly, and counts the rejection, when the dispatcher is stopped
    /// or the bounded queue is full.
    pub fn post<E: Event>(
        &self,
        event: E,
    ) -> Result<()> {
        let event_type = std::any::type_name::<E>();
        if *self.inner.state.lock() == DispatcherState::Stopped {
            self.inner.metrics.rejected.inc();
            warn!(event_type, "Event posted to stopped dispatcher");
            return Err(DispatchError::NotRunning { event_type }.into());
        }

        let envelope = Envelope::Event {
            type_id: TypeId::of::<E>(),
            type_name: event_type,
            payload: Box::new(event),
        };

        match self.inner.tx.try_send(envelope) {
            Ok(()) => {
                self.inner.metrics.posted.inc();
                trace!(event_type, "Event posted");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.inner.metrics.rejected.inc();
                warn!(event_type, capacity = self.inner.config.queue_capacity, "Event queue full");
                Err(DispatchError::QueueFull {
                    capacity: self.inner.config.queue_capacity,
                    event_type,
                }
                .into())
            }
            Err(TrySendError::Disconnected(_)) => {
                self.inner.metrics.rejected.inc();
                Err(DispatchError::QueueClosed { event_type }.into())
            }
        }
    }

    /// Registers the sink for events of type `E`, replacing any previous one.
    pub fn add_sink<E, S>(
        &self,
        sink: Arc<S>,
    ) where
        E: Event,
        S: EventSink<E>,
    {
        let type_name = std::any::type_name::<E>();
        let entry = SinkEntry {
            type_name,
            sink: Arc::new(SinkAdapter::<E, S>::new(sink)),
        };
        if self.inner.sinks.insert(TypeId::of::<E>(), entry).is_some() {
            debug!(event_type = type_name, "Replaced event sink");
        } else {
            debug!(event_type = type_name, "Registered event sink");
        }
    }

    /// Returns whether a sink was registered for `E`.
    pub fn remove_sink<E: Event>(&self) -> bool {
        self.inner.sinks.remove(&TypeId::of::<E>()).is_some()
    }

    /// Type names of every event with a registered sink, sorted.
    pub fn sinks(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.inner.sinks.iter().map(|e| e.value().type_name).collect();
        names.sort_unstable();
        names
    }

    pub fn stats(&self) -> DispatcherStats {
        let m = &self.inner.metrics;
        DispatcherStats {
            posted: m.posted.get(),
            delivered: m.delivered.get(),
            unhandled: m.unhandled.get(),
            failed: m.failed.get(),
            rejected: m.rejected.get(),
            respawns: m.respawns.get(),
            queued: self.inner.rx.len(),
        }
    }

    pub fn register_metrics(
        &self,
        registry: &Registry,
    ) -> Result<()> {
        self.inner.metrics.register(registry)
    }
}

impl DispatcherInner {
    fn spawn_loop(inner: &Arc<DispatcherInner>) -> Result<()> {
        let id = inner.next_loop_id.fetch_add(1, Ordering::Relaxed);
        let (done_tx, done_rx) = bounded::<()>(0);
        let dispatch_loop = Arc::new(DispatchLoop {
            id,
            cancel: CancellationToken::new(),
            progress: Mutex::new(LoopProgress::default()),
            done: done_rx,
        });

        let name = format!("event-dispatch-{id}");
        let thread_inner = inner.clone();
        let thread_loop = dispatch_loop.clone();
        std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _done = done_tx;
                run_loop(&thread_inner, &thread_loop);
            })
            .map_err(|source| DispatchError::Spawn { name, source })?;

        inner.current.store(Some(dispatch_loop));
        debug!(loop_id = id, "Dispatch loop started");
        Ok(())
    }
}

fn run_loop(
    inner: &DispatcherInner,
    dispatch_loop: &DispatchLoop,
) {
    loop {
        let envelope = match inner.rx.recv() {
            Ok(envelope) => envelope,
            Err(_) => {
                warn!("Event queue closed unexpectedly");
                break;
            }
        };

        let (type_id, type_name, payload) = match envelope {
            Envelope::Kill => {
                debug!(loop_id = dispatch_loop.id, "Dispatch loop received kill marker");
                break;
            }
            Envelope::Event {
                type_id,
                type_name,
                payload,
            } => (type_id, type_name, payload),
        };

        let sink = inner.sinks.get(&type_id).map(|entry| entry.sink.clone());
        let Some(sink) = sink else {
            inner.metrics.unhandled.inc();
            warn!(event_type = type_name, "No sink registered for event");
            continue;
        };

        {
            let mut progress = dispatch_loop.progress.lock();
            progress.started = Some(Instant::now());
            progress.type_name = type_name;
            progress.sink = Some(sink.clone());
        }

        let result = catch_unwind(AssertUnwindSafe(|| {
            sink.process_any(payload.as_ref(), &dispatch_loop.cancel)
        }));

        let cancelled = {
            let mut progress = dispatch_loop.progress.lock();
            progress.started = None;
            progress.sink = None;
            dispatch_loop.cancel.is_cancelled()
        };

        match result {
            Ok(Ok(())) => {
                inner.metrics.delivered.inc();
            }
            Ok(Err(e)) => {
                inner.metrics.failed.inc();
                warn!(event_type = type_name, "Sink failed to process event: {:?}", e);
            }
            Err(_) => {
                inner.metrics.failed.inc();
                error!(event_type = type_name, "Sink panicked while processing event");
            }
        }

        if cancelled {
            debug!(loop_id = dispatch_loop.id, "Abandoned dispatch loop exiting");
            break;
        }
    }
}

fn run_watchdog(
    inner: Arc<DispatcherInner>,
    shutdown: Receiver<()>,
    interval: Duration,
    limit: Duration,
) {
    debug!(?interval, ?limit, "Event watchdog started");

    loop {
        match shutdown.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => break,
        }

        let Some(current) = inner.current.load_full() else {
            continue;
        };

        let stuck = {
            let mut progress = current.progress.lock();
            match progress.started {
                Some(started) if started.elapsed() > limit => {
                    current.cancel.cancel();
                    Some((progress.sink.take(), progress.type_name, started.elapsed()))
                }
                _ => None,
            }
        };

        let Some((sink, type_name, elapsed)) = stuck else {
            continue;
        };

        warn!(
            loop_id = current.id,
            event_type = type_name,
            elapsed_ms = elapsed.as_millis() as u64,
            "Event sink exceeded processing limit; replacing dispatch loop"
        );

        if let Some(sink) = sink {
            if catch_unwind(AssertUnwindSafe(|| sink.on_process_limit())).is_err() {
                error!(event_type = type_name, "Sink panicked in on_process_limit");
            }
        }

        inner.metrics.respawns.inc();
        if let Err(e) = DispatcherInner::spawn_loop(&inner) {
            error!("Failed to respawn dispatch loop: {:?}", e);
        }
    }

    debug!("Event watchdog stopped");
}
