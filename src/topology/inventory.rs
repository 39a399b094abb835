//! Provider-side view of the network.
//!
//! Discovery providers report devices, ports and links here; every snapshot
//! handed to the topology manager is produced by [`NetworkInventory::describe`].

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;
use tracing::debug;

use super::GraphDescription;
use crate::net::ConnectPoint;
use crate::net::Device;
use crate::net::DeviceId;
use crate::net::Link;
use crate::net::LinkKey;
use crate::net::LinkState;
use crate::net::LinkType;
use crate::net::Port;
use crate::net::PortNumber;
use crate::net::ProviderId;
use crate::utils::time::get_now_as_millis;
use crate::utils::time::get_now_as_nanos;
use crate::Result;
use crate::StaticNetwork;
use crate::TopologyError;

#[derive(Debug, Default)]
struct InventoryState {
    /// Insertion ordered
    devices: Vec<Device>,
    ports: HashMap<DeviceId, BTreeMap<PortNumber, Port>>,
    links: BTreeMap<LinkKey, Link>,
}

impl InventoryState {
    fn position(
        &self,
        device_id: &DeviceId,
    ) -> Option<usize> {
        self.devices.iter().position(|d| d.id() == device_id)
    }

    fn port_enabled(
        &self,
        point: &ConnectPoint,
    ) -> bool {
        self.ports
            .get(point.device_id())
            .and_then(|ports| ports.get(&point.port()))
            .map_or(true, Port::is_enabled)
    }
}

#[derive(Debug)]
pub struct NetworkInventory {
    provider_id: ProviderId,
    state: RwLock<InventoryState>,
    last_time: AtomicU64,
}

impl NetworkInventory {
    pub fn new(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            state: RwLock::new(InventoryState::default()),
            last_time: AtomicU64::new(0),
        }
    }

    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    /// Adds or replaces a device. Returns `true` when anything changed.
    pub fn add_device(
        &self,
        device: Device,
    ) -> bool {
        let mut state = self.state.write();
        match state.position(device.id()) {
            Some(i) if state.devices[i] == device => false,
            Some(i) => {
                debug!(device_id = %device.id(), "Device updated");
                state.devices[i] = device;
                true
            }
            None => {
                debug!(device_id = %device.id(), "Device added");
                state.devices.push(device);
                true
            }
        }
    }

    /// Removes the device with its ports and every link touching it.
    pub fn remove_device(
        &self,
        device_id: &DeviceId,
    ) -> Option<Device> {
        let mut state = self.state.write();
        let position = state.position(device_id)?;
        let device = state.devices.remove(position);
        state.ports.remove(device_id);
        state
            .links
            .retain(|key, _| key.src.device_id() != device_id && key.dst.device_id() != device_id);
        debug!(%device_id, "Device removed");
        Some(device)
    }

    pub fn device(
        &self,
        device_id: &DeviceId,
    ) -> Option<Device> {
        let state = self.state.read();
        state.position(device_id).map(|i| state.devices[i].clone())
    }

    pub fn devices(&self) -> Vec<Device> {
        self.state.read().devices.clone()
    }

    pub fn device_count(&self) -> usize {
        self.state.read().devices.len()
    }

    /// Adds or replaces a port. Links on a disabled port go inactive, and
    /// come back when it is enabled again.
    pub fn update_port(
        &self,
        device_id: &DeviceId,
        port: Port,
    ) -> Result<()> {
        let mut state = self.state.write();
        if state.position(device_id).is_none() {
            return Err(TopologyError::DeviceNotFound(device_id.to_string()).into());
        }

        let point = ConnectPoint::new(device_id.clone(), port.number());
        let link_state = if port.is_enabled() {
            LinkState::Active
        } else {
            LinkState::Inactive
        };
        state.ports.entry(device_id.clone()).or_default().insert(port.number(), port);

        let touched: Vec<LinkKey> = state
            .links
            .keys()
            .filter(|key| key.src == point || key.dst == point)
            .cloned()
            .collect();
        for key in touched {
            let active = link_state == LinkState::Active
                && state.port_enabled(&key.src)
                && state.port_enabled(&key.dst);
            let target = if active {
                LinkState::Active
            } else {
                LinkState::Inactive
            };
            if let Some(link) = state.links.get_mut(&key) {
                if link.state() != target {
                    debug!(link = %key, state = ?target, "Link state changed with port");
                    *link = link.clone().with_state(target);
                }
            }
        }
        Ok(())
    }

    pub fn ports(
        &self,
        device_id: &DeviceId,
    ) -> Vec<Port> {
        self.state
            .read()
            .ports
            .get(device_id)
            .map(|ports| ports.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Adds or replaces a link. Both endpoint devices must be known.
    /// Returns `true` when anything changed.
    pub fn add_link(
        &self,
        link: Link,
    ) -> Result<bool> {
        let mut state = self.state.write();
        for point in [link.src(), link.dst()] {
            if state.position(point.device_id()).is_none() {
                return Err(TopologyError::DeviceNotFound(point.device_id().to_string()).into());
            }
        }

        let link = if state.port_enabled(link.src()) && state.port_enabled(link.dst()) {
            link
        } else {
            link.with_state(LinkState::Inactive)
        };

        let key = link.key();
        if state.links.get(&key) == Some(&link) {
            return Ok(false);
        }
        debug!(link = %key, "Link added");
        state.links.insert(key, link);
        Ok(true)
    }

    pub fn remove_link(
        &self,
        key: &LinkKey,
    ) -> Option<Link> {
        let removed = self.state.write().links.remove(key);
        if removed.is_some() {
            debug!(link = %key, "Link removed");
        }
        removed
    }

    /// Adds the configured devices and direct links.
    pub fn load_static(
        &self,
        network: &StaticNetwork,
    ) -> Result<()> {
        for device_id in &network.devices {
            self.add_device(Device::new(device_id.clone()));
        }
        for key in &network.links {
            let link = Link::new(key.src.clone(), key.dst.clone(), LinkType::Direct, self.provider_id.clone());
            self.add_link(link)?;
        }
        debug!(
            devices = network.devices.len(),
            links = network.links.len(),
            "Static network loaded"
        );
        Ok(())
    }

    pub fn links(&self) -> Vec<Link> {
        self.state.read().links.values().cloned().collect()
    }

    pub fn link_count(&self) -> usize {
        self.state.read().links.len()
    }

    /// Snapshot of the current inventory. Successive descriptions carry
    /// strictly increasing times.
    pub fn describe(&self) -> GraphDescription {
        let time = self.next_time();
        let state = self.state.read();
        GraphDescription::new(
            time,
            get_now_as_millis(),
            state.devices.iter().cloned(),
            state.links.values().cloned(),
        )
    }

    fn next_time(&self) -> u64 {
        let now = get_now_as_nanos();
        let mut last = self.last_time.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self
                .last_time
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}
