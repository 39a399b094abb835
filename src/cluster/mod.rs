//! Controller cluster membership and inter-node messaging.
//!
//! Membership is static (taken from configuration); messaging is abstracted
//! behind [`ClusterCommunicator`] so replicated stores do not depend on a
//! concrete transport.

mod communicator;
mod local_hub;
pub use communicator::*;
pub use local_hub::*;


use std::fmt;

#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;

use crate::ClusterConfig;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerNode {
    pub id: NodeId,
    pub ip: String,
    pub port: u16,
}

impl ControllerNode {
    pub fn new(
        id: NodeId,
        ip: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id,
            ip: ip.into(),
            port,
        }
    }
}

#[cfg_attr(test, automock)]
pub trait ClusterService: Send + Sync + 'static {
    /// The node this process runs as
    fn local_node(&self) -> ControllerNode;

    /// All nodes (including itself)
    fn nodes(&self) -> Vec<ControllerNode>;

    /// All nodes except the local one
    fn peers(&self) -> Vec<NodeId> {
        let local = self.local_node().id;
        self.nodes().into_iter().map(|n| n.id).filter(|id| *id != local).collect()
    }
}

/// Membership fixed at construction time.
#[derive(Debug, Clone)]
pub struct StaticClusterService {
    local: ControllerNode,
    nodes: Vec<ControllerNode>,
}

impl StaticClusterService {
    pub fn new(
        local: ControllerNode,
        nodes: Vec<ControllerNode>,
    ) -> Self {
        let mut nodes = nodes;
        if !nodes.iter().any(|n| n.id == local.id) {
            nodes.push(local.clone());
        }
        Self { local, nodes }
    }

    /// Builds the membership from a validated [`ClusterConfig`].
    pub fn from_config(config: &ClusterConfig) -> Self {
        let local_id = config.local_node_id();
        let local = config
            .members
            .iter()
            .find(|n| n.id == local_id)
            .cloned()
            .unwrap_or_else(|| ControllerNode::new(local_id, "127.0.0.1", 0));
        Self::new(local, config.members.clone())
    }
}

impl ClusterService for StaticClusterService {
    fn local_node(&self) -> ControllerNode {
        self.local.clone()
    }

    fn nodes(&self) -> Vec<ControllerNode> {
        self.nodes.clone()
    }
}
