//! Fixtures shared by unit tests.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crate::cluster::ClusterCommunicator;
use crate::cluster::ClusterService;
use crate::cluster::ControllerNode;
use crate::cluster::LocalClusterHub;
use crate::cluster::NodeId;
use crate::cluster::StaticClusterService;
use crate::net::ConnectPoint;
use crate::net::Device;
use crate::net::DeviceId;
use crate::net::Link;
use crate::net::LinkType;
use crate::net::PortNumber;
use crate::net::ProviderId;
use crate::topology::GraphDescription;

pub fn did(n: u32) -> DeviceId {
    DeviceId::new(format!("of:{n}"))
}

pub fn cp(
    device: u32,
    port: u64,
) -> ConnectPoint {
    ConnectPoint::new(did(device), PortNumber::new(port))
}

/// Both directions of a connection between `a/pa` and `b/pb`.
pub fn bidi(
    a: u32,
    pa: u64,
    b: u32,
    pb: u64,
) -> [Link; 2] {
    bidi_typed(a, pa, b, pb, LinkType::Direct)
}

pub fn bidi_typed(
    a: u32,
    pa: u64,
    b: u32,
    pb: u64,
    link_type: LinkType,
) -> [Link; 2] {
    [
        Link::new(cp(a, pa), cp(b, pb), link_type, ProviderId::core()),
        Link::new(cp(b, pb), cp(a, pa), link_type, ProviderId::core()),
    ]
}

pub fn description(
    time: u64,
    devices: impl IntoIterator<Item = u32>,
    links: impl IntoIterator<Item = Link>,
) -> GraphDescription {
    GraphDescription::new(time, time / 1_000_000, devices.into_iter().map(|n| Device::new(did(n))), links)
}

/// Devices 1..=5 with links 1-2, 2-3, 1-4, 3-4; device 5 is isolated.
///
/// Ports: 1/1-2/1, 2/2-3/1, 1/2-4/1, 3/2-4/2.
pub fn example_description(time: u64) -> GraphDescription {
    let links = [bidi(1, 1, 2, 1), bidi(2, 2, 3, 1), bidi(1, 2, 4, 1), bidi(3, 2, 4, 2)];
    description(time, 1..=5, links.into_iter().flatten())
}

pub fn node(id: &str) -> NodeId {
    NodeId::new(id)
}

/// Messaging and membership for `local` in a cluster of `members`.
pub fn cluster_member(
    hub: &LocalClusterHub,
    local: &str,
    members: &[&str],
) -> (Arc<dyn ClusterCommunicator>, Arc<dyn ClusterService>) {
    let nodes: Vec<ControllerNode> = members
        .iter()
        .enumerate()
        .map(|(i, id)| ControllerNode::new(node(id), "127.0.0.1", 9876 + i as u16))
        .collect();
    let local_node = nodes
        .iter()
        .find(|n| n.id == node(local))
        .cloned()
        .unwrap_or_else(|| ControllerNode::new(node(local), "127.0.0.1", 9875));
    (
        Arc::new(hub.communicator(node(local))),
        Arc::new(StaticClusterService::new(local_node, nodes)),
    )
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
