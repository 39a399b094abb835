//! Network topology and mastership coordination core.
//!
//! - [`event`]: in-order event dispatch with a watchdog guarding the loop
//! - [`topology`]: immutable topology snapshots, clusters and path search
//! - [`store`]: mastership table, eventually-consistent replicated map and
//!   the region, multicast and DHCP relay stores built on them
//! - [`cluster`]: controller membership and inter-node messaging

pub mod cluster;
mod config;
mod errors;
pub mod event;
mod metrics;
pub mod net;
pub mod store;
pub mod topology;
pub mod utils;

pub use cluster::*;
pub use config::*;
pub use errors::*;
pub use metrics::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
