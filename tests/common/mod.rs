#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use topocore::cluster::ClusterCommunicator;
use topocore::cluster::ClusterService;
use topocore::cluster::ControllerNode;
use topocore::cluster::LocalClusterHub;
use topocore::cluster::NodeId;
use topocore::cluster::StaticClusterService;
use topocore::net::ConnectPoint;
use topocore::net::Device;
use topocore::net::DeviceId;
use topocore::net::Link;
use topocore::net::LinkType;
use topocore::net::PortNumber;
use topocore::net::ProviderId;
use topocore::store::EventuallyConsistentMap;
use topocore::topology::GraphDescription;
use topocore::EcMapConfig;

pub const WAIT: Duration = Duration::from_secs(5);

pub fn did(n: u32) -> DeviceId {
    DeviceId::new(format!("of:{n}"))
}

pub fn cp(
    device: u32,
    port: u64,
) -> ConnectPoint {
    ConnectPoint::new(did(device), PortNumber::new(port))
}

/// A linear chain `1 - 2 - ... - n` described at `time`.
pub fn chain(
    time: u64,
    n: u32,
) -> GraphDescription {
    let links = (1..n).flat_map(|d| {
        [
            Link::new(cp(d, 2), cp(d + 1, 1), LinkType::Direct, ProviderId::core()),
            Link::new(cp(d + 1, 1), cp(d, 2), LinkType::Direct, ProviderId::core()),
        ]
    });
    GraphDescription::new(time, time, (1..=n).map(|d| Device::new(did(d))), links)
}

pub fn members(ids: &[&str]) -> Vec<ControllerNode> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| ControllerNode::new(NodeId::new(*id), "127.0.0.1", 9876 + i as u16))
        .collect()
}

/// Replication settings tuned for tests: fast anti-entropy, no background
/// purge.
pub fn fast_ecmap_config() -> EcMapConfig {
    EcMapConfig {
        anti_entropy_period_ms: 50,
        tombstones_enabled: true,
        purge_period_ms: 3_600_000,
    }
}

/// One replica of map `name` per member, all attached to `hub`.
pub fn replicas(
    hub: &LocalClusterHub,
    name: &str,
    ids: &[&str],
    config: EcMapConfig,
) -> Vec<EventuallyConsistentMap<String, String>> {
    let nodes = members(ids);
    nodes
        .iter()
        .map(|local| {
            let communicator: Arc<dyn ClusterCommunicator> = Arc::new(hub.communicator(local.id.clone()));
            let cluster: Arc<dyn ClusterService> = Arc::new(StaticClusterService::new(local.clone(), nodes.clone()));
            EventuallyConsistentMap::<String, String>::builder()
                .with_name(name)
                .with_communicator(communicator)
                .with_cluster_service(cluster)
                .with_config(config.clone())
                .build()
                .expect("build replica")
        })
        .collect()
}

/// Polls `check` every 10ms until it holds or `timeout` passes.
pub async fn wait_until(
    timeout: Duration,
    mut check: impl FnMut() -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
