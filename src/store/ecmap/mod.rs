//! Eventually consistent replicated map.
//!
//! Every write is stamped by a [`TimestampProvider`](crate::store::TimestampProvider)
//! and pushed to all peers. Replicas keep the entry with the strictly newest
//! timestamp; removals are tombstones so that remove/update races resolve the
//! same way. A periodic anti-entropy exchange repairs lost updates.

mod map;
mod map_value;
mod messages;

pub use map::*;
pub use map_value::*;


use std::fmt::Debug;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::event::Event;
use crate::utils::time::get_now_as_millis;

/// Bounds required of replicated map keys.
pub trait EcMapKey: Clone + Eq + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> EcMapKey for T where T: Clone + Eq + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Bounds required of replicated map values.
pub trait EcMapData: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> EcMapData for T where T: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcMapEventType {
    Put,
    Remove,
}

/// Accepted state transition of one key. For removals `value` is the value
/// that was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct EcMapEvent<K, V> {
    map_name: String,
    event_type: EcMapEventType,
    key: K,
    value: V,
    time: u64,
}

impl<K, V> EcMapEvent<K, V> {
    pub fn new(
        map_name: impl Into<String>,
        event_type: EcMapEventType,
        key: K,
        value: V,
    ) -> Self {
        Self {
            map_name: map_name.into(),
            event_type,
            key,
            value,
            time: get_now_as_millis(),
        }
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<K, V> Event for EcMapEvent<K, V>
where
    K: Debug + Send + Sync + 'static,
    V: Debug + Send + Sync + 'static,
{
    type Type = EcMapEventType;
    type Subject = K;

    fn event_type(&self) -> EcMapEventType {
        self.event_type
    }

    fn subject(&self) -> &K {
        &self.key
    }

    fn time(&self) -> u64 {
        self.time
    }
}

/// Observes accepted transitions of a replicated map. Called on the writer's
/// thread for local writes and on the map's receiver task for remote ones.
pub trait EcMapListener<K, V>: Send + Sync + 'static {
    fn event(
        &self,
        event: &EcMapEvent<K, V>,
    );
}

impl<K, V, F> EcMapListener<K, V> for F
where
    F: Fn(&EcMapEvent<K, V>) + Send + Sync + 'static,
{
    fn event(
        &self,
        event: &EcMapEvent<K, V>,
    ) {
        self(event)
    }
}
