use std::collections::HashSet;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::ControllerNode;
use crate::Error;
use crate::NodeId;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// All controller nodes, including the local one
    #[serde(default = "default_members")]
    pub members: Vec<ControllerNode>,

    /// Log files are written to `<log_dir>/<node_id>/`
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            members: default_members(),
            log_dir: default_log_dir(),
        }
    }
}

impl ClusterConfig {
    /// Validates cluster configuration consistency
    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            return Err(Error::InvalidConfig("node_id cannot be empty".into()));
        }

        if self.members.is_empty() {
            return Err(Error::InvalidConfig("members must contain at least one node".into()));
        }

        let mut ids = HashSet::new();
        for node in &self.members {
            if !ids.insert(node.id.clone()) {
                return Err(Error::InvalidConfig(format!(
                    "Duplicate node id {} in members",
                    node.id
                )));
            }
        }

        if !ids.contains(&self.local_node_id()) {
            return Err(Error::InvalidConfig(format!(
                "Current node {} not found in members",
                self.node_id
            )));
        }

        Ok(())
    }

    pub fn local_node_id(&self) -> NodeId {
        NodeId::new(self.node_id.clone())
    }
}

fn default_node_id() -> String {
    "node-1".to_string()
}

fn default_members() -> Vec<ControllerNode> {
    vec![ControllerNode {
        id: NodeId::new(default_node_id()),
        ip: "127.0.0.1".to_string(),
        port: 9876,
    }]
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}
