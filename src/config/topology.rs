use serde::Deserialize;
use serde::Serialize;

use crate::net::DeviceId;
use crate::net::LinkKey;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TopologyConfig {
    /// Number of recent topology events kept for inspection
    #[serde(default = "default_event_history_size")]
    pub event_history_size: usize,

    /// Cap on equal-cost paths returned per query. 0 returns every tie.
    #[serde(default)]
    pub max_paths: usize,

    /// Devices and direct links known before any provider reports
    #[serde(default)]
    pub static_network: StaticNetwork,
}

/// Infrastructure described in configuration, e.g.
///
/// ```toml
/// [topology.static_network]
/// devices = ["of:1", "of:2"]
/// links = [{ src = { device_id = "of:1", port = 2 }, dst = { device_id = "of:2", port = 1 } }]
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StaticNetwork {
    #[serde(default)]
    pub devices: Vec<DeviceId>,
    /// Directional; list both directions for a bidirectional connection
    #[serde(default)]
    pub links: Vec<LinkKey>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            event_history_size: default_event_history_size(),
            max_paths: 0,
            static_network: StaticNetwork::default(),
        }
    }
}

impl TopologyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.event_history_size == 0 {
            return Err(Error::InvalidConfig("event_history_size must be > 0".into()));
        }
        let devices = &self.static_network.devices;
        for key in &self.static_network.links {
            for point in [&key.src, &key.dst] {
                if !devices.contains(point.device_id()) {
                    return Err(Error::InvalidConfig(format!(
                        "static link {key} references unknown device {}",
                        point.device_id()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn default_event_history_size() -> usize {
    100
}
