//! Device mastership.
//!
//! Every device has at most one master node and an ordered list of standby
//! nodes. Which requester becomes master is decided by an [`ElectionPolicy`].

mod policy;
mod store;

pub use policy::*;
pub use store::*;


use serde::Deserialize;
use serde::Serialize;

use crate::cluster::NodeId;
use crate::event::Event;
use crate::net::DeviceId;
use crate::utils::time::get_now_as_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MastershipRole {
    /// Owns the device
    Master,
    /// Takes over when the master goes away
    Standby,
    /// No relationship with the device
    None,
}

/// Master and standbys of one device, standbys in order of preference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    master: Option<NodeId>,
    backups: Vec<NodeId>,
}

impl RoleInfo {
    pub fn new(
        master: Option<NodeId>,
        backups: Vec<NodeId>,
    ) -> Self {
        Self { master, backups }
    }

    pub fn master(&self) -> Option<&NodeId> {
        self.master.as_ref()
    }

    pub fn backups(&self) -> &[NodeId] {
        &self.backups
    }
}

/// Master of a device together with the number of master changes it has
/// seen. Lets a node detect that its mastership was superseded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MastershipTerm {
    master: NodeId,
    term: u64,
}

impl MastershipTerm {
    pub fn new(
        master: NodeId,
        term: u64,
    ) -> Self {
        Self { master, term }
    }

    pub fn master(&self) -> &NodeId {
        &self.master
    }

    pub fn term(&self) -> u64 {
        self.term
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MastershipEventType {
    MasterChanged,
    BackupsChanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MastershipEvent {
    event_type: MastershipEventType,
    device_id: DeviceId,
    role_info: RoleInfo,
    time: u64,
}

impl MastershipEvent {
    pub fn new(
        event_type: MastershipEventType,
        device_id: DeviceId,
        role_info: RoleInfo,
    ) -> Self {
        Self {
            event_type,
            device_id,
            role_info,
            time: get_now_as_millis(),
        }
    }

    pub fn role_info(&self) -> &RoleInfo {
        &self.role_info
    }
}

impl Event for MastershipEvent {
    type Type = MastershipEventType;
    type Subject = DeviceId;

    fn event_type(&self) -> MastershipEventType {
        self.event_type
    }

    fn subject(&self) -> &DeviceId {
        &self.device_id
    }

    fn time(&self) -> u64 {
        self.time
    }
}
