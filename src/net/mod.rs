//! Network model: identities, devices, ports, links and paths.
//!
//! All model objects are immutable values; updates replace them wholesale.

mod device;
mod ids;
mod link;
mod path;
mod port;
mod weight;

pub use device::*;
pub use ids::*;
pub use link::*;
pub use path::*;
pub use port::*;
pub use weight::*;
