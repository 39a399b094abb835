use super::*;
use crate::cluster::NodeId;

#[test]
fn test_ordering_is_term_then_sequence() {
    assert!(Timestamp::new(2, 0).is_newer_than(&Timestamp::new(1, 99)));
    assert!(Timestamp::new(1, 5).is_newer_than(&Timestamp::new(1, 4)));
    assert!(!Timestamp::new(1, 4).is_newer_than(&Timestamp::new(1, 4)));
}

#[test]
fn test_clock_never_goes_backwards() {
    let clock = LogicalClock::new(&NodeId::new("node-1"));

    let a = clock.next_at_for_test(100);
    let b = clock.next_at_for_test(100);
    let c = clock.next_at_for_test(50);
    let d = clock.next_at_for_test(101);

    assert!(b > a);
    assert!(c > b);
    assert_eq!(c.term, 100);
    assert!(d > c);
    assert_eq!(d.term, 101);
}

#[test]
fn test_clocks_on_different_nodes_do_not_collide() {
    let a = LogicalClock::new(&NodeId::new("node-a"));
    let b = LogicalClock::new(&NodeId::new("node-b"));

    assert_ne!(a.next_at_for_test(10), b.next_at_for_test(10));
}

#[test]
fn test_closure_provider() {
    let provider = |key: &u64, _value: Option<&String>| Timestamp::new(*key, 0);
    assert_eq!(provider.timestamp(&7, None), Timestamp::new(7, 0));
}
