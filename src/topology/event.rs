use std::collections::BTreeSet;
use std::sync::Arc;

use super::Topology;
use crate::event::Event;
use crate::net::DeviceId;
use crate::net::LinkKey;
use crate::utils::time::get_now_as_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyEventType {
    TopologyChanged,
}

/// Devices and links that differ between two consecutive snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyDelta {
    pub devices_added: Vec<DeviceId>,
    pub devices_removed: Vec<DeviceId>,
    pub links_added: Vec<LinkKey>,
    pub links_removed: Vec<LinkKey>,
}

impl TopologyDelta {
    pub fn between(
        previous: &Topology,
        next: &Topology,
    ) -> Self {
        let devices = |t: &Topology| -> BTreeSet<DeviceId> {
            t.graph().vertices().iter().map(|v| v.device_id().clone()).collect()
        };
        let links = |t: &Topology| -> BTreeSet<LinkKey> {
            t.graph().edges().iter().map(|e| e.link().key()).collect()
        };

        let (old_devices, new_devices) = (devices(previous), devices(next));
        let (old_links, new_links) = (links(previous), links(next));

        Self {
            devices_added: new_devices.difference(&old_devices).cloned().collect(),
            devices_removed: old_devices.difference(&new_devices).cloned().collect(),
            links_added: new_links.difference(&old_links).cloned().collect(),
            links_removed: old_links.difference(&new_links).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.devices_added.is_empty()
            && self.devices_removed.is_empty()
            && self.links_added.is_empty()
            && self.links_removed.is_empty()
    }
}

/// Emitted whenever a new topology snapshot replaces the current one.
#[derive(Debug, Clone)]
pub struct TopologyEvent {
    event_type: TopologyEventType,
    topology: Arc<Topology>,
    delta: TopologyDelta,
    reasons: Vec<String>,
    time: u64,
}

impl TopologyEvent {
    pub fn new(
        topology: Arc<Topology>,
        delta: TopologyDelta,
        reasons: Vec<String>,
    ) -> Self {
        Self {
            event_type: TopologyEventType::TopologyChanged,
            topology,
            delta,
            reasons,
            time: get_now_as_millis(),
        }
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn delta(&self) -> &TopologyDelta {
        &self.delta
    }

    /// Provider-side changes that triggered the recomputation
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }
}

impl Event for TopologyEvent {
    type Type = TopologyEventType;
    type Subject = Arc<Topology>;

    fn event_type(&self) -> TopologyEventType {
        self.event_type
    }

    fn subject(&self) -> &Arc<Topology> {
        &self.topology
    }

    fn time(&self) -> u64 {
        self.time
    }
}
