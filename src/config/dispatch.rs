use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DispatchConfig {
    /// How often the watchdog samples the running dispatch loop
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,

    /// Longest a single sink invocation may run before the loop is replaced.
    /// 0 disables the watchdog.
    #[serde(default = "default_max_process_ms")]
    pub max_process_ms: u64,

    /// Event queue capacity. 0 means unbounded.
    #[serde(default)]
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            watchdog_interval_ms: default_watchdog_interval_ms(),
            max_process_ms: default_max_process_ms(),
            queue_capacity: 0,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.watchdog_interval_ms == 0 {
            return Err(Error::InvalidConfig("watchdog_interval_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    /// `None` when the watchdog is disabled.
    pub fn max_process_time(&self) -> Option<Duration> {
        (self.max_process_ms > 0).then(|| Duration::from_millis(self.max_process_ms))
    }
}

fn default_watchdog_interval_ms() -> u64 {
    250
}
fn default_max_process_ms() -> u64 {
    5000
}
