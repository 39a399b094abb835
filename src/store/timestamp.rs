use std::fmt;

use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;

use crate::cluster::NodeId;
use crate::utils::time::get_now_as_millis;

/// Logical timestamp compared by `term`, then `sequence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub term: u64,
    pub sequence: u64,
}

impl Timestamp {
    pub const fn new(
        term: u64,
        sequence: u64,
    ) -> Self {
        Self { term, sequence }
    }

    pub fn is_newer_than(
        &self,
        other: &Timestamp,
    ) -> bool {
        self > other
    }
}

impl fmt::Display for Timestamp {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}.{}", self.term, self.sequence)
    }
}

/// Stamps writes to a replicated map. `value` is `None` for removals.
pub trait TimestampProvider<K, V>: Send + Sync + 'static {
    fn timestamp(
        &self,
        key: &K,
        value: Option<&V>,
    ) -> Timestamp;
}

impl<K, V, F> TimestampProvider<K, V> for F
where
    F: Fn(&K, Option<&V>) -> Timestamp + Send + Sync + 'static,
{
    fn timestamp(
        &self,
        key: &K,
        value: Option<&V>,
    ) -> Timestamp {
        self(key, value)
    }
}

/// Node-local clock yielding strictly increasing timestamps.
///
/// `term` follows wall-clock milliseconds but never goes backwards. The low
/// 16 bits of `sequence` carry a tag derived from the node id so that two
/// nodes writing in the same millisecond still produce distinct stamps.
#[derive(Debug)]
pub struct LogicalClock {
    node_tag: u64,
    last: Mutex<(u64, u64)>,
}

const TAG_BITS: u32 = 16;

impl LogicalClock {
    pub fn new(node_id: &NodeId) -> Self {
        Self {
            node_tag: node_tag(node_id),
            last: Mutex::new((0, 0)),
        }
    }

    pub fn next(&self) -> Timestamp {
        self.next_at(get_now_as_millis())
    }

    fn next_at(
        &self,
        now_ms: u64,
    ) -> Timestamp {
        let mut last = self.last.lock();
        let (last_term, last_counter) = *last;
        let (term, counter) = if now_ms > last_term {
            (now_ms, 0)
        } else {
            (last_term, last_counter + 1)
        };
        *last = (term, counter);
        Timestamp::new(term, (counter << TAG_BITS) | self.node_tag)
    }
}

impl<K: 'static, V: 'static> TimestampProvider<K, V> for LogicalClock {
    fn timestamp(
        &self,
        _key: &K,
        _value: Option<&V>,
    ) -> Timestamp {
        self.next()
    }
}

/// FNV-1a over the node id, folded to `TAG_BITS`.
fn node_tag(node_id: &NodeId) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in node_id.as_str().bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash & ((1 << TAG_BITS) - 1)
}

#[cfg(test)]
impl LogicalClock {
    pub(crate) fn next_at_for_test(
        &self,
        now_ms: u64,
    ) -> Timestamp {
        self.next_at(now_ms)
    }
}
