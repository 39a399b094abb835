use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::Event;
use crate::DispatchError;
use crate::Result;

/// The single handler registered for one event type.
///
/// `process` runs on the dispatch loop thread. Long-running sinks should poll
/// `cancel`; it fires once the watchdog has given up on the current loop.
pub trait EventSink<E: Event>: Send + Sync + 'static {
    fn process(
        &self,
        event: &E,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Called by the watchdog after `process` exceeded the processing limit.
    /// The stuck loop's token is already cancelled.
    fn on_process_limit(&self) {}
}

pub(crate) trait ErasedSink: Send + Sync {
    fn process_any(
        &self,
        event: &(dyn Any + Send),
        cancel: &CancellationToken,
    ) -> Result<()>;

    fn on_process_limit(&self);
}

pub(crate) struct SinkAdapter<E, S> {
    sink: Arc<S>,
    _event: PhantomData<fn() -> E>,
}

impl<E, S> SinkAdapter<E, S> {
    pub(crate) fn new(sink: Arc<S>) -> Self {
        Self {
            sink,
            _event: PhantomData,
        }
    }
}

impl<E, S> ErasedSink for SinkAdapter<E, S>
where
    E: Event,
    S: EventSink<E>,
{
    fn process_any(
        &self,
        event: &(dyn Any + Send),
        cancel: &CancellationToken,
    ) -> Result<()> {
        match event.downcast_ref::<E>() {
            Some(event) => self.sink.process(event, cancel),
            None => Err(DispatchError::SinkFailed {
                event_type: std::any::type_name::<E>(),
                reason: "event type mismatch".to_string(),
            }
            .into()),
        }
    }

    fn on_process_limit(&self) {
        self.sink.on_process_limit()
    }
}
