//! Replicated and domain stores.
//!
//! Stores report accepted mutations to a single [`StoreDelegate`]. Whether the
//! delegate is called from inside the mutating call or from a replication
//! task depends on the store; delegates must not assume either.

pub mod dhcp_relay;
pub mod ecmap;
pub mod mastership;
pub mod mcast;
pub mod region;
mod timestamp;

pub use dhcp_relay::*;
pub use ecmap::*;
pub use mastership::*;
pub use mcast::*;
pub use region::*;
pub use timestamp::*;

#[cfg(test)]
mod timestamp_test;

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;

/// Receives the events produced by one store.
#[cfg_attr(test, automock)]
pub trait StoreDelegate<E: Send + Sync + 'static>: Send + Sync + 'static {
    fn notify(
        &self,
        event: E,
    );
}

/// Holds the delegate currently attached to a store.
pub struct DelegateSlot<E: Send + Sync + 'static> {
    delegate: RwLock<Option<Arc<dyn StoreDelegate<E>>>>,
}

impl<E: Send + Sync + 'static> Default for DelegateSlot<E> {
    fn default() -> Self {
        Self {
            delegate: RwLock::new(None),
        }
    }
}

impl<E: Send + Sync + 'static> std::fmt::Debug for DelegateSlot<E> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DelegateSlot")
            .field("attached", &self.has_delegate())
            .finish()
    }
}

impl<E: Send + Sync + 'static> DelegateSlot<E> {
    pub fn set(
        &self,
        delegate: Arc<dyn StoreDelegate<E>>,
    ) {
        *self.delegate.write() = Some(delegate);
    }

    pub fn unset(&self) {
        *self.delegate.write() = None;
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.read().is_some()
    }

    /// Hands `event` to the delegate, if any. Events without a delegate are
    /// discarded.
    pub fn notify(
        &self,
        event: E,
    ) {
        let delegate = self.delegate.read().clone();
        if let Some(delegate) = delegate {
            delegate.notify(event);
        }
    }
}
