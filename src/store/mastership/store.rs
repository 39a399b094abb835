use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use tracing::info;

use super::ElectionPolicy;
use super::FirstRequesterPolicy;
use super::MastershipEvent;
use super::MastershipEventType;
use super::MastershipRole;
use super::MastershipTerm;
use super::RoleInfo;
use crate::cluster::NodeId;
use crate::net::DeviceId;
use crate::store::DelegateSlot;
use crate::store::StoreDelegate;

#[derive(Debug, Clone, Default)]
struct DeviceMastership {
    master: Option<NodeId>,
    /// Master changes so far
    term: u64,
    backups: Vec<NodeId>,
}

impl DeviceMastership {
    fn role_of(
        &self,
        node_id: &NodeId,
    ) -> MastershipRole {
        if self.master.as_ref() == Some(node_id) {
            MastershipRole::Master
        } else if self.backups.contains(node_id) {
            MastershipRole::Standby
        } else {
            MastershipRole::None
        }
    }

    fn role_info(&self) -> RoleInfo {
        RoleInfo::new(self.master.clone(), self.backups.clone())
    }

    fn add_backup(
        &mut self,
        node_id: NodeId,
    ) -> bool {
        if self.backups.contains(&node_id) {
            return false;
        }
        self.backups.push(node_id);
        true
    }

    fn remove_backup(
        &mut self,
        node_id: &NodeId,
    ) -> bool {
        let before = self.backups.len();
        self.backups.retain(|n| n != node_id);
        self.backups.len() != before
    }

    /// Installs `next` as master. The replaced master, if it is not being
    /// dropped, becomes the last standby.
    fn change_master(
        &mut self,
        next: Option<NodeId>,
        demote_previous: bool,
    ) {
        if let Some(next) = &next {
            self.remove_backup(next);
            self.term += 1;
        }
        let previous = std::mem::replace(&mut self.master, next);
        if let Some(previous) = previous {
            if demote_previous {
                self.add_backup(previous);
            }
        }
    }
}

/// Mastership table of the local controller.
///
/// Each device's entry is updated under its own lock, so racing updates of
/// one device serialize while different devices never contend.
#[derive(Debug)]
pub struct MastershipStore {
    local_node: NodeId,
    policy: Arc<dyn ElectionPolicy>,
    devices: DashMap<DeviceId, DeviceMastership>,
    delegate: DelegateSlot<MastershipEvent>,
}

impl MastershipStore {
    /// Store electing with [`FirstRequesterPolicy`].
    pub fn new(local_node: NodeId) -> Self {
        Self::with_policy(local_node, Arc::new(FirstRequesterPolicy))
    }

    pub fn with_policy(
        local_node: NodeId,
        policy: Arc<dyn ElectionPolicy>,
    ) -> Self {
        Self {
            local_node,
            policy,
            devices: DashMap::new(),
            delegate: DelegateSlot::default(),
        }
    }

    pub fn local_node(&self) -> &NodeId {
        &self.local_node
    }

    pub fn set_delegate(
        &self,
        delegate: Arc<dyn StoreDelegate<MastershipEvent>>,
    ) {
        self.delegate.set(delegate);
    }

    pub fn unset_delegate(&self) {
        self.delegate.unset();
    }

    /// Requests a role for the local node on `device_id`.
    pub fn request_role(
        &self,
        device_id: &DeviceId,
    ) -> MastershipRole {
        self.request_role_for(&self.local_node, device_id)
    }

    /// Enlists `node_id` as a candidate for `device_id` and lets the policy
    /// elect. Any resulting change is reported to the delegate.
    pub fn request_role_for(
        &self,
        node_id: &NodeId,
        device_id: &DeviceId,
    ) -> MastershipRole {
        let (role, event) = {
            let mut entry = self.devices.entry(device_id.clone()).or_default();
            let mastership = entry.value_mut();

            let enlisted = mastership.master.as_ref() != Some(node_id)
                && mastership.add_backup(node_id.clone());
            let elected = self
                .policy
                .elect(device_id, mastership.master.as_ref(), &mastership.backups);

            let event_type = if elected != mastership.master {
                mastership.change_master(elected, true);
                Some(MastershipEventType::MasterChanged)
            } else if enlisted {
                Some(MastershipEventType::BackupsChanged)
            } else {
                None
            };
            let event = event_type.map(|t| MastershipEvent::new(t, device_id.clone(), mastership.role_info()));
            (mastership.role_of(node_id), event)
        };

        if let Some(event) = event {
            debug!(%device_id, %node_id, ?role, "Role requested");
            self.delegate.notify(event);
        }
        role
    }

    /// Makes `node_id` master of `device_id`. Returns `None` when it already
    /// is.
    pub fn set_master(
        &self,
        node_id: &NodeId,
        device_id: &DeviceId,
    ) -> Option<MastershipEvent> {
        let mut entry = self.devices.entry(device_id.clone()).or_default();
        let mastership = entry.value_mut();
        if mastership.master.as_ref() == Some(node_id) {
            return None;
        }
        mastership.change_master(Some(node_id.clone()), true);
        info!(%device_id, master = %node_id, term = mastership.term, "Master changed");
        Some(MastershipEvent::new(
            MastershipEventType::MasterChanged,
            device_id.clone(),
            mastership.role_info(),
        ))
    }

    /// Makes `node_id` a standby. A master stepping down hands the device to
    /// the next elected standby, or leaves it masterless.
    pub fn set_standby(
        &self,
        node_id: &NodeId,
        device_id: &DeviceId,
    ) -> Option<MastershipEvent> {
        let mut entry = self.devices.entry(device_id.clone()).or_default();
        let mastership = entry.value_mut();
        let event_type = match mastership.role_of(node_id) {
            MastershipRole::Master => {
                let next = self.policy.elect(device_id, None, &mastership.backups);
                mastership.change_master(next, true);
                MastershipEventType::MasterChanged
            }
            MastershipRole::Standby => return None,
            MastershipRole::None => {
                mastership.add_backup(node_id.clone());
                MastershipEventType::BackupsChanged
            }
        };
        Some(MastershipEvent::new(
            event_type,
            device_id.clone(),
            mastership.role_info(),
        ))
    }

    /// Drops every role `node_id` holds on `device_id`. A departing master is
    /// replaced by the next elected standby.
    pub fn relinquish_role(
        &self,
        node_id: &NodeId,
        device_id: &DeviceId,
    ) -> Option<MastershipEvent> {
        let mut entry = self.devices.get_mut(device_id)?;
        let mastership = entry.value_mut();
        let event_type = match mastership.role_of(node_id) {
            MastershipRole::Master => {
                let next = self.policy.elect(device_id, None, &mastership.backups);
                mastership.change_master(next, false);
                MastershipEventType::MasterChanged
            }
            MastershipRole::Standby => {
                mastership.remove_backup(node_id);
                MastershipEventType::BackupsChanged
            }
            MastershipRole::None => return None,
        };
        debug!(%device_id, %node_id, "Role relinquished");
        Some(MastershipEvent::new(
            event_type,
            device_id.clone(),
            mastership.role_info(),
        ))
    }

    /// Drops `node_id` from every device, typically when it leaves the
    /// cluster.
    pub fn relinquish_all_roles(
        &self,
        node_id: &NodeId,
    ) -> Vec<MastershipEvent> {
        let involved: Vec<DeviceId> = self
            .devices
            .iter()
            .filter(|e| e.value().role_of(node_id) != MastershipRole::None)
            .map(|e| e.key().clone())
            .collect();
        involved
            .iter()
            .filter_map(|device_id| self.relinquish_role(node_id, device_id))
            .collect()
    }

    pub fn get_master(
        &self,
        device_id: &DeviceId,
    ) -> Option<NodeId> {
        self.devices.get(device_id).and_then(|m| m.master.clone())
    }

    pub fn get_role(
        &self,
        node_id: &NodeId,
        device_id: &DeviceId,
    ) -> MastershipRole {
        self.devices
            .get(device_id)
            .map_or(MastershipRole::None, |m| m.role_of(node_id))
    }

    pub fn get_nodes(
        &self,
        device_id: &DeviceId,
    ) -> RoleInfo {
        self.devices
            .get(device_id)
            .map(|m| m.role_info())
            .unwrap_or_default()
    }

    /// Devices mastered by `node_id`.
    pub fn get_devices(
        &self,
        node_id: &NodeId,
    ) -> BTreeSet<DeviceId> {
        self.devices
            .iter()
            .filter(|e| e.value().master.as_ref() == Some(node_id))
            .map(|e| e.key().clone())
            .collect()
    }

    /// `None` while the device has no master.
    pub fn get_term_for(
        &self,
        device_id: &DeviceId,
    ) -> Option<MastershipTerm> {
        let mastership = self.devices.get(device_id)?;
        let master = mastership.master.clone()?;
        Some(MastershipTerm::new(master, mastership.term))
    }
}
