//! Topology Core Error Hierarchy
//!
//! Defines the error types surfaced by the event dispatcher, the topology
//! engine and the replicated stores, categorized by layer.
//!
//! Expected "not present yet" outcomes are modelled as `Option` returns by
//! the owning APIs and never reach this hierarchy.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (cluster messaging, serialization)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Event queue and dispatch loop failures
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Topology graph computation failures
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Store state transition failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Dispatcher was stopped; posts are rejected
    #[error("Event dispatcher is not running; dropped {event_type}")]
    NotRunning { event_type: &'static str },

    /// A stopped dispatcher cannot be started again
    #[error("Event dispatcher has been stopped")]
    Stopped,

    /// Bounded event queue is at capacity
    #[error("Event queue is full (capacity {capacity}); dropped {event_type}")]
    QueueFull {
        capacity: usize,
        event_type: &'static str,
    },

    /// Event queue receiver is gone
    #[error("Event queue closed; dropped {event_type}")]
    QueueClosed { event_type: &'static str },

    /// Sink reported a processing failure
    #[error("Sink for {event_type} failed: {reason}")]
    SinkFailed {
        event_type: &'static str,
        reason: String,
    },

    /// Failed to spawn the dispatch loop or watchdog thread
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// Device referenced by a link or query is not in the inventory
    #[error("Device {0} not found")]
    DeviceNotFound(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Operation invoked on a map after `destroy()`
    #[error("{0} map is already destroyed")]
    Destroyed(String),

    /// Duplicate create
    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: &'static str, id: String },

    /// Referenced item is missing where the operation requires it
    #[error("{kind} {id} not found")]
    ItemNotFound { kind: &'static str, id: String },

    /// Invalid state transition requested by the caller
    #[error("Illegal state: {0}")]
    IllegalState(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    // Cluster messaging layer
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    //Serialization
    #[error("Serialization error")]
    Serialization(#[from] SerializationError),

    #[error("Failed to install signal handler: {0}")]
    SignalHandler(String),

    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// Message addressed to a node without a subscriber for the subject
    #[error("Node {node_id} has no subscriber for {subject}")]
    NoSubscriber { node_id: String, subject: String },

    /// Subscriber already registered for this subject on this node
    #[error("Subject {subject} already subscribed on node {node_id}")]
    AlreadySubscribed { node_id: String, subject: String },

    /// Link between the two nodes is partitioned
    #[error("Node {to} unreachable from {from}")]
    Unreachable { from: String, to: String },

    /// Peer inbox closed
    #[error("Inbox of node {0} closed")]
    InboxClosed(String),
}

// Serialization is classified separately (across protocol layers and system layers)
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Bincode serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
}

// ============== Conversion Implementations ============== //
impl From<ClusterError> for Error {
    fn from(e: ClusterError) -> Self {
        Error::System(SystemError::Cluster(e))
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        SerializationError::Bincode(e).into()
    }
}

impl From<prometheus::Error> for Error {
    fn from(e: prometheus::Error) -> Self {
        Error::System(SystemError::Metrics(e))
    }
}
