use std::collections::HashMap;

use crate::net::Device;
use crate::net::DeviceId;
use crate::net::Link;
use crate::net::LinkKey;

/// Devices and links observed at one point in time.
///
/// Duplicate devices (by id) and links (by key) keep their first position and
/// the last value. Links whose endpoints are not among the devices are
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct GraphDescription {
    time: u64,
    creation_time: u64,
    devices: Vec<Device>,
    links: Vec<Link>,
}

impl GraphDescription {
    /// `time` orders descriptions (nanoseconds); `creation_time` is wall
    /// clock milliseconds.
    pub fn new(
        time: u64,
        creation_time: u64,
        devices: impl IntoIterator<Item = Device>,
        links: impl IntoIterator<Item = Link>,
    ) -> Self {
        let mut device_index: HashMap<DeviceId, usize> = HashMap::new();
        let mut unique_devices: Vec<Device> = Vec::new();
        for device in devices {
            match device_index.get(device.id()) {
                Some(&i) => unique_devices[i] = device,
                None => {
                    device_index.insert(device.id().clone(), unique_devices.len());
                    unique_devices.push(device);
                }
            }
        }

        let mut link_index: HashMap<LinkKey, usize> = HashMap::new();
        let mut unique_links: Vec<Link> = Vec::new();
        for link in links {
            if !device_index.contains_key(link.src().device_id())
                || !device_index.contains_key(link.dst().device_id())
            {
                continue;
            }
            let key = link.key();
            match link_index.get(&key) {
                Some(&i) => unique_links[i] = link,
                None => {
                    link_index.insert(key, unique_links.len());
                    unique_links.push(link);
                }
            }
        }

        Self {
            time,
            creation_time,
            devices: unique_devices,
            links: unique_links,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }
}
