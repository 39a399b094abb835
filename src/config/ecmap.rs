use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EcMapConfig {
    /// Period between digest advertisements to a random peer
    #[serde(default = "default_anti_entropy_period_ms")]
    pub anti_entropy_period_ms: u64,

    /// Keep tombstones so concurrent remove/update races resolve by timestamp
    #[serde(default = "default_tombstones_enabled")]
    pub tombstones_enabled: bool,

    /// Period between tombstone purge passes
    #[serde(default = "default_purge_period_ms")]
    pub purge_period_ms: u64,
}

impl Default for EcMapConfig {
    fn default() -> Self {
        Self {
            anti_entropy_period_ms: default_anti_entropy_period_ms(),
            tombstones_enabled: default_tombstones_enabled(),
            purge_period_ms: default_purge_period_ms(),
        }
    }
}

impl EcMapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.anti_entropy_period_ms == 0 {
            return Err(Error::InvalidConfig("anti_entropy_period_ms must be > 0".into()));
        }
        if self.purge_period_ms == 0 {
            return Err(Error::InvalidConfig("purge_period_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn anti_entropy_period(&self) -> Duration {
        Duration::from_millis(self.anti_entropy_period_ms)
    }

    pub fn purge_period(&self) -> Duration {
        Duration::from_millis(self.purge_period_ms)
    }
}

fn default_anti_entropy_period_ms() -> u64 {
    5000
}
fn default_tombstones_enabled() -> bool {
    true
}
fn default_purge_period_ms() -> u64 {
    60_000
}
