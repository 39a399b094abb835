//! Regions: named groups of devices with preferred master nodes.

mod store;

pub use store::*;

#[cfg(test)]
mod region_test;

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::cluster::NodeId;
use crate::event::Event;
use crate::net::DeviceId;
use crate::utils::time::get_now_as_millis;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionType {
    Continent,
    Country,
    Metro,
    Campus,
    Building,
    DataCenter,
    Floor,
    Room,
    Rack,
    LogicalGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    id: RegionId,
    name: String,
    region_type: RegionType,
    /// Master candidates in order of preference, one set per tier
    masters: Vec<BTreeSet<NodeId>>,
}

impl Region {
    pub fn new(
        id: RegionId,
        name: impl Into<String>,
        region_type: RegionType,
        masters: Vec<BTreeSet<NodeId>>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            region_type,
            masters,
        }
    }

    pub fn id(&self) -> &RegionId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region_type(&self) -> RegionType {
        self.region_type
    }

    pub fn masters(&self) -> &[BTreeSet<NodeId>] {
        &self.masters
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionEventType {
    RegionAdded,
    RegionRemoved,
    RegionUpdated,
    RegionMembershipChanged,
}

/// Region change. `devices` is the region's membership after the change.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionEvent {
    event_type: RegionEventType,
    region: Region,
    devices: BTreeSet<DeviceId>,
    time: u64,
}

impl RegionEvent {
    pub fn new(
        event_type: RegionEventType,
        region: Region,
        devices: BTreeSet<DeviceId>,
    ) -> Self {
        Self {
            event_type,
            region,
            devices,
            time: get_now_as_millis(),
        }
    }

    pub fn devices(&self) -> &BTreeSet<DeviceId> {
        &self.devices
    }
}

impl Event for RegionEvent {
    type Type = RegionEventType;
    type Subject = Region;

    fn event_type(&self) -> RegionEventType {
        self.event_type
    }

    fn subject(&self) -> &Region {
        &self.region
    }

    fn time(&self) -> u64 {
        self.time
    }
}
