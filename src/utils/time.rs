use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

pub(crate) fn get_duration_since_epoch() -> Duration {
    // Zero for clocks set before 1970
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

/// return millisecond
pub fn get_now_as_millis() -> u64 {
    get_duration_since_epoch().as_millis() as u64
}

/// return nanosecond
pub fn get_now_as_nanos() -> u64 {
    get_duration_since_epoch().as_nanos() as u64
}
