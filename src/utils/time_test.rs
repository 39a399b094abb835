use std::thread::sleep;
use std::time::Duration;

use super::time::get_duration_since_epoch;
use super::time::get_now_as_millis;
use super::time::get_now_as_nanos;

#[test]
fn test_get_duration_since_epoch() {
    let duration = get_duration_since_epoch();
    // Should be a reasonable value (somewhere between 1970 and now)
    assert!(duration.as_secs() > 1609459200); // Greater than 2021-01-01
}

#[test]
fn test_get_now_as_millis() {
    let t1 = get_now_as_millis();
    sleep(Duration::from_millis(10));
    let t2 = get_now_as_millis();

    // Ensure time is moving forward
    assert!(t2 > t1);
    // Difference should be at least 10ms
    assert!(t2 - t1 >= 10);
}

#[test]
fn test_get_now_as_nanos_is_finer_than_millis() {
    let millis = get_now_as_millis();
    let nanos = get_now_as_nanos();

    assert!(nanos / 1_000_000 >= millis);
}
