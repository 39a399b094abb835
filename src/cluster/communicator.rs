use bytes::Bytes;
use tokio::sync::mpsc;

use super::NodeId;
use crate::Result;

/// Message delivered to a subject subscriber.
#[derive(Debug, Clone)]
pub struct ClusterMessage {
    pub sender: NodeId,
    pub subject: String,
    pub payload: Bytes,
}

/// Point-to-point messaging between controller nodes.
///
/// Sends never block; delivery is at-most-once per call and callers that need
/// at-least-once semantics retry (anti-entropy does this for replicated maps).
pub trait ClusterCommunicator: Send + Sync + 'static {
    fn local_node_id(&self) -> &NodeId;

    fn unicast(
        &self,
        subject: &str,
        to: &NodeId,
        payload: Bytes,
    ) -> Result<()>;

    /// Registers the single inbox for `subject` on this node.
    fn subscribe(
        &self,
        subject: &str,
    ) -> Result<mpsc::UnboundedReceiver<ClusterMessage>>;

    fn unsubscribe(
        &self,
        subject: &str,
    );
}
