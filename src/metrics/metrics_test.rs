use super::*;

#[test]
fn test_dispatch_metrics_register_and_encode() {
    let registry = Registry::new();
    let metrics = DispatchMetrics::new();
    metrics.register(&registry).unwrap();

    metrics.posted.inc();
    metrics.posted.inc();
    metrics.unhandled.inc();

    let text = encode_text(&registry);
    assert!(text.contains("topocore_dispatch_posted_total 2"));
    assert!(text.contains("topocore_dispatch_unhandled_total 1"));
}

#[test]
fn test_double_registration_fails() {
    let registry = Registry::new();
    let metrics = TopologyMetrics::new();
    metrics.register(&registry).unwrap();

    assert!(metrics.register(&registry).is_err());
}

#[test]
fn test_instances_are_independent() {
    let a = DispatchMetrics::new();
    let b = DispatchMetrics::new();
    a.failed.inc();

    assert_eq!(a.failed.get(), 1);
    assert_eq!(b.failed.get(), 0);
}
