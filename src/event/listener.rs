use std::fmt;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::ThreadId;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::Event;
use super::EventSink;
use crate::Result;

/// Receives events fanned out by a [`ListenerRegistry`].
pub trait EventListener<E: Event>: Send + Sync + 'static {
    fn event(
        &self,
        event: &E,
    );

    /// Filters events before `event` is called.
    fn is_relevant(
        &self,
        _event: &E,
    ) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Fan-out sink: delivers each event to every relevant listener in
/// registration order.
///
/// A listener that panics is logged and skipped. A listener still running on
/// a loop whose token the watchdog cancelled is removed from the registry.
pub struct ListenerRegistry<E: Event> {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn EventListener<E>>)>>,
    next_id: AtomicU64,
    /// Listener each dispatch thread is currently inside
    running: DashMap<ThreadId, (CancellationToken, ListenerId)>,
}

impl<E: Event> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for ListenerRegistry<E> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("event_type", &std::any::type_name::<E>())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl<E: Event> ListenerRegistry<E> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            running: DashMap::new(),
        }
    }

    pub fn add_listener(
        &self,
        listener: Arc<dyn EventListener<E>>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        debug!(%id, event_type = std::any::type_name::<E>(), "Listener added");
        id
    }

    pub fn remove_listener(
        &self,
        id: ListenerId,
    ) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        before != listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl<E: Event> EventSink<E> for ListenerRegistry<E> {
    fn process(
        &self,
        event: &E,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let listeners = self.listeners.read().clone();

        for (id, listener) in listeners {
            if cancel.is_cancelled() {
                debug!(%id, "Dispatch cancelled; skipping remaining listeners");
                break;
            }
            if !listener.is_relevant(event) {
                continue;
            }

            let thread = std::thread::current().id();
            self.running.insert(thread, (cancel.clone(), id));
            if catch_unwind(AssertUnwindSafe(|| listener.event(event))).is_err() {
                error!(%id, ?event, "Listener panicked");
            }
            // An abandoned loop only clears its own record
            self.running.remove(&thread);
        }
        Ok(())
    }

    fn on_process_limit(&self) {
        let mut stuck = Vec::new();
        self.running.retain(|_, (token, id)| {
            if token.is_cancelled() {
                stuck.push(*id);
                false
            } else {
                true
            }
        });

        for id in stuck {
            if self.remove_listener(id) {
                warn!(%id, "Removed listener that exceeded the processing limit");
            }
        }
    }
}
