use serde::Deserialize;
use serde::Serialize;

use crate::store::Timestamp;
use crate::utils::time::get_now_as_millis;

/// Stamped value of one map entry. `value == None` marks a tombstone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapValue<V> {
    value: Option<V>,
    timestamp: Timestamp,
    /// Local wall clock (ms) at which this replica created the entry
    #[serde(skip, default = "get_now_as_millis")]
    creation_time: u64,
}

impl<V> MapValue<V> {
    pub fn new(
        value: V,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            value: Some(value),
            timestamp,
            creation_time: get_now_as_millis(),
        }
    }

    pub fn tombstone(timestamp: Timestamp) -> Self {
        Self {
            value: None,
            timestamp,
            creation_time: get_now_as_millis(),
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    pub fn is_alive(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<V> {
        self.value
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    pub fn is_newer_than(
        &self,
        other: &MapValue<V>,
    ) -> bool {
        self.timestamp.is_newer_than(&other.timestamp)
    }

    pub fn digest(&self) -> Digest {
        Digest {
            timestamp: self.timestamp,
            is_tombstone: self.is_tombstone(),
        }
    }
}

/// What anti-entropy advertises per key instead of the value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub timestamp: Timestamp,
    pub is_tombstone: bool,
}

impl Digest {
    pub fn is_newer_than(
        &self,
        other: &Digest,
    ) -> bool {
        self.timestamp.is_newer_than(&other.timestamp)
    }
}
