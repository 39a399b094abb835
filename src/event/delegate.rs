use std::marker::PhantomData;

use tracing::warn;

use super::Event;
use super::EventDispatcher;
use crate::store::StoreDelegate;

/// Store delegate that forwards every store event to the dispatcher.
#[derive(Debug, Clone)]
pub struct EventDeliveryDelegate<E> {
    dispatcher: EventDispatcher,
    _event: PhantomData<fn(E)>,
}

impl<E> EventDeliveryDelegate<E> {
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self {
            dispatcher,
            _event: PhantomData,
        }
    }
}

impl<E: Event> StoreDelegate<E> for EventDeliveryDelegate<E> {
    fn notify(
        &self,
        event: E,
    ) {
        if let Err(e) = self.dispatcher.post(event) {
            warn!("Failed to deliver store event: {:?}", e);
        }
    }
}
