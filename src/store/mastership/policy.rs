use std::collections::HashMap;
use std::fmt::Debug;

use crate::cluster::NodeId;
use crate::net::DeviceId;

/// Decides which node masters a device.
pub trait ElectionPolicy: Debug + Send + Sync + 'static {
    /// Picks the master among `candidates`, which lists standbys in request
    /// order. `current` is the sitting master, if any, and is not repeated in
    /// `candidates`.
    fn elect(
        &self,
        device_id: &DeviceId,
        current: Option<&NodeId>,
        candidates: &[NodeId],
    ) -> Option<NodeId>;
}

/// A sitting master keeps the device; otherwise the earliest requester wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstRequesterPolicy;

impl ElectionPolicy for FirstRequesterPolicy {
    fn elect(
        &self,
        _device_id: &DeviceId,
        current: Option<&NodeId>,
        candidates: &[NodeId],
    ) -> Option<NodeId> {
        current.or_else(|| candidates.first()).cloned()
    }
}

/// Highest priority node wins and preempts a lower priority master.
///
/// Nodes without a configured priority rank 0. On a tie the sitting master
/// stays, then the earliest requester wins.
#[derive(Debug, Clone, Default)]
pub struct PriorityPolicy {
    priorities: HashMap<NodeId, u32>,
}

impl PriorityPolicy {
    pub fn new(priorities: impl IntoIterator<Item = (NodeId, u32)>) -> Self {
        Self {
            priorities: priorities.into_iter().collect(),
        }
    }

    pub fn priority(
        &self,
        node_id: &NodeId,
    ) -> u32 {
        self.priorities.get(node_id).copied().unwrap_or(0)
    }
}

impl ElectionPolicy for PriorityPolicy {
    fn elect(
        &self,
        _device_id: &DeviceId,
        current: Option<&NodeId>,
        candidates: &[NodeId],
    ) -> Option<NodeId> {
        let mut winner = current;
        for candidate in candidates {
            match winner {
                Some(best) if self.priority(candidate) <= self.priority(best) => {}
                _ => winner = Some(candidate),
            }
        }
        winner.cloned()
    }
}
