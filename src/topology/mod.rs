//! Topology graph engine.
//!
//! A [`GraphDescription`] (devices + links at a point in time) is turned into
//! an immutable [`Topology`] snapshot that answers cluster, broadcast and path
//! queries. [`TopologyManager`] swaps snapshots in atomically and emits a
//! [`TopologyEvent`] for each one.

mod description;
mod event;
mod graph;
mod inventory;
mod manager;
mod search;
mod snapshot;
mod weigher;

pub use description::*;
pub use event::*;
pub use graph::*;
pub use inventory::*;
pub use manager::*;
pub use search::KShortestPaths;
pub use snapshot::*;
pub use weigher::*;

#[cfg(test)]
mod manager_test;
