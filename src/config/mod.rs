//! Configuration management for a topology core node.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Environment variable overrides
//! - Configuration file support
//! - Component-wise validation
mod cluster;
mod dispatch;
mod ecmap;
mod topology;
pub use cluster::*;
pub use dispatch::*;
pub use ecmap::*;
pub use topology::*;
#[cfg(test)]
mod config_test;

use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment prefix for overrides, e.g. `TOPO__DISPATCH__MAX_PROCESS_MS=0`.
const ENV_PREFIX: &str = "TOPO";

/// Main configuration container for topology core components
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct NodeConfig {
    /// Cluster membership and local node identity
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Event queue, dispatch loop and watchdog parameters
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Topology snapshot and event history parameters
    #[serde(default)]
    pub topology: TopologyConfig,
    /// Eventually-consistent map replication parameters
    #[serde(default)]
    pub ecmap: EcMapConfig,
}

impl Debug for NodeConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NodeConfig")
            .field("cluster", &self.cluster)
            .field("dispatch", &self.dispatch)
            .finish()
    }
}

impl NodeConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `TOPO__` prefix (highest priority)
    ///
    /// # Note
    /// This method does NOT validate the configuration. Callers MUST call `validate()`
    /// before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/node.toml");
    /// std::env::set_var("TOPO__CLUSTER__NODE_ID", "node-2");
    /// let cfg = NodeConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    ///
    /// Consumes self and performs validation of all subsystems.
    pub fn validate(self) -> Result<Self> {
        self.cluster.validate()?;
        self.dispatch.validate()?;
        self.topology.validate()?;
        self.ecmap.validate()?;
        Ok(self)
    }
}
