//! In-process cluster transport.
//!
//! Every node of a simulated cluster shares one [`LocalClusterHub`]; each node
//! talks through its own [`LocalClusterCommunicator`]. Links between node
//! pairs can be partitioned and healed to exercise convergence paths.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dashmap::DashSet;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;

use super::ClusterCommunicator;
use super::ClusterMessage;
use super::NodeId;
use crate::ClusterError;
use crate::Result;

#[derive(Debug, Default)]
struct HubInner {
    inboxes: DashMap<(NodeId, String), mpsc::UnboundedSender<ClusterMessage>>,
    partitions: DashSet<(NodeId, NodeId)>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl HubInner {
    fn pair(
        a: &NodeId,
        b: &NodeId,
    ) -> (NodeId, NodeId) {
        if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct LocalClusterHub {
    inner: Arc<HubInner>,
}

impl LocalClusterHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn communicator(
        &self,
        node_id: NodeId,
    ) -> LocalClusterCommunicator {
        LocalClusterCommunicator {
            node_id,
            hub: self.inner.clone(),
        }
    }

    /// Drops every message between `a` and `b` until healed.
    pub fn partition(
        &self,
        a: &NodeId,
        b: &NodeId,
    ) {
        debug!(%a, %b, "partitioning nodes");
        self.inner.partitions.insert(HubInner::pair(a, b));
    }

    pub fn heal(
        &self,
        a: &NodeId,
        b: &NodeId,
    ) {
        debug!(%a, %b, "healing partition");
        self.inner.partitions.remove(&HubInner::pair(a, b));
    }

    pub fn heal_all(&self) {
        self.inner.partitions.clear();
    }

    pub fn delivered_messages(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped_messages(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct LocalClusterCommunicator {
    node_id: NodeId,
    hub: Arc<HubInner>,
}

impl ClusterCommunicator for LocalClusterCommunicator {
    fn local_node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn unicast(
        &self,
        subject: &str,
        to: &NodeId,
        payload: Bytes,
    ) -> Result<()> {
        if self.hub.partitions.contains(&HubInner::pair(&self.node_id, to)) {
            self.hub.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(ClusterError::Unreachable {
                from: self.node_id.to_string(),
                to: to.to_string(),
            }
            .into());
        }

        let key = (to.clone(), subject.to_string());
        let sender = match self.hub.inboxes.get(&key) {
            Some(sender) => sender.clone(),
            None => {
                self.hub.dropped.fetch_add(1, Ordering::Relaxed);
                return Err(ClusterError::NoSubscriber {
                    node_id: to.to_string(),
                    subject: subject.to_string(),
                }
                .into());
            }
        };

        let message = ClusterMessage {
            sender: self.node_id.clone(),
            subject: subject.to_string(),
            payload,
        };
        if sender.send(message).is_err() {
            self.hub.dropped.fetch_add(1, Ordering::Relaxed);
            self.hub.inboxes.remove_if(&key, |_, s| s.is_closed());
            return Err(ClusterError::InboxClosed(to.to_string()).into());
        }

        self.hub.delivered.fetch_add(1, Ordering::Relaxed);
        trace!(from = %self.node_id, %to, subject, "message delivered");
        Ok(())
    }

    fn subscribe(
        &self,
        subject: &str,
    ) -> Result<mpsc::UnboundedReceiver<ClusterMessage>> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.hub.inboxes.entry((self.node_id.clone(), subject.to_string())) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_closed() {
                    return Err(ClusterError::AlreadySubscribed {
                        node_id: self.node_id.to_string(),
                        subject: subject.to_string(),
                    }
                    .into());
                }
                occupied.insert(tx);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(tx);
            }
        }
        Ok(rx)
    }

    fn unsubscribe(
        &self,
        subject: &str,
    ) {
        self.hub.inboxes.remove(&(self.node_id.clone(), subject.to_string()));
    }
}
