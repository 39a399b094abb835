use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::unbounded;
use crossbeam_channel::Sender;

use super::*;
use crate::event::Event;
use crate::event::EventDispatcher;
use crate::event::EventListener;
use crate::net::ProviderId;
use crate::net::Weight;
use crate::test_utils::bidi;
use crate::test_utils::description;
use crate::test_utils::did;
use crate::test_utils::example_description;
use crate::DispatchConfig;
use crate::TopologyConfig;

struct Forward(Sender<TopologyEvent>);

impl EventListener<TopologyEvent> for Forward {
    fn event(
        &self,
        event: &TopologyEvent,
    ) {
        let _ = self.0.send(event.clone());
    }
}

fn setup(config: TopologyConfig) -> (TopologyManager, EventDispatcher) {
    let dispatcher = EventDispatcher::new(DispatchConfig::default());
    let manager = TopologyManager::new(config, dispatcher.clone());
    dispatcher.start().unwrap();
    (manager, dispatcher)
}

#[test]
fn test_starts_with_empty_topology() {
    let (manager, dispatcher) = setup(TopologyConfig::default());

    let topology = manager.current_topology();
    assert_eq!(topology.device_count(), 0);
    assert_eq!(topology.cluster_count(), 0);
    assert!(manager.is_latest(&topology));
    dispatcher.stop();
}

/// # Case 1: a new description swaps the snapshot and notifies listeners
#[test]
fn test_update_emits_event_to_listeners() {
    let (manager, dispatcher) = setup(TopologyConfig::default());
    let (tx, rx) = unbounded();
    manager.add_listener(Arc::new(Forward(tx)));

    let before = manager.current_topology();
    let event = manager
        .update_topology(ProviderId::core(), &example_description(10), vec!["devices discovered".into()])
        .unwrap()
        .unwrap();

    assert!(!manager.is_latest(&before));
    assert!(manager.is_latest(event.topology()));
    assert_eq!(event.delta().devices_added.len(), 5);
    assert_eq!(event.delta().links_added.len(), 8);
    assert_eq!(event.reasons(), &["devices discovered".to_string()]);

    let delivered = rx.recv_timeout(Duration::from_secs(3)).unwrap();
    assert_eq!(delivered.event_type(), TopologyEventType::TopologyChanged);
    assert!(Arc::ptr_eq(delivered.subject(), event.topology()));
    dispatcher.stop();
}

/// # Case 2: an undeliverable event does not undo the update
#[test]
fn test_update_stands_when_dispatcher_is_stopped() {
    let (manager, dispatcher) = setup(TopologyConfig::default());
    dispatcher.stop();

    let event = manager
        .update_topology(ProviderId::core(), &example_description(10), vec![])
        .unwrap()
        .unwrap();

    assert!(manager.is_latest(event.topology()));
    assert_eq!(manager.recent_events(10).len(), 1);
    assert_eq!(dispatcher.stats().rejected, 1);
}

/// # Case 3: descriptions older than the current snapshot are ignored
#[test]
fn test_stale_description_is_ignored() {
    let (manager, dispatcher) = setup(TopologyConfig::default());

    manager
        .update_topology(ProviderId::core(), &example_description(20), vec![])
        .unwrap();
    let current = manager.current_topology();

    let stale = manager
        .update_topology(ProviderId::core(), &description(10, [1], vec![]), vec![])
        .unwrap();
    assert!(stale.is_none());
    assert!(manager.is_latest(&current));
    assert_eq!(manager.current_topology().device_count(), 5);
    dispatcher.stop();
}

#[test]
fn test_delta_reports_removals() {
    let (manager, dispatcher) = setup(TopologyConfig::default());

    manager
        .update_topology(ProviderId::core(), &example_description(1), vec![])
        .unwrap();
    let shrunk = description(2, 1..=2, bidi(1, 1, 2, 1));
    let event = manager
        .update_topology(ProviderId::core(), &shrunk, vec![])
        .unwrap()
        .unwrap();

    assert_eq!(event.delta().devices_removed, vec![did(3), did(4), did(5)]);
    assert_eq!(event.delta().links_removed.len(), 6);
    assert!(event.delta().devices_added.is_empty());
    dispatcher.stop();
}

#[test]
fn test_recent_events_are_bounded() {
    let (manager, dispatcher) = setup(TopologyConfig {
        event_history_size: 2,
        ..TopologyConfig::default()
    });

    for time in 1..=3 {
        manager
            .update_topology(ProviderId::core(), &example_description(time), vec![format!("t{time}")])
            .unwrap();
    }

    let recent = manager.recent_events(10);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].reasons(), &["t2".to_string()]);
    assert_eq!(recent[1].reasons(), &["t3".to_string()]);
    assert_eq!(manager.recent_events(1)[0].reasons(), &["t3".to_string()]);
    assert_eq!(manager.metrics().events.get(), 3);
    assert_eq!(manager.metrics().clusters.get(), 2);
    dispatcher.stop();
}

#[test]
fn test_default_weigher_applies_to_later_snapshots() {
    let (manager, dispatcher) = setup(TopologyConfig::default());
    manager.set_default_weigher(Some(Arc::new(|edge: &TopologyEdge| {
        if *edge.src() == did(4) || *edge.dst() == did(4) {
            Weight::new(2.0)
        } else {
            Weight::new(1.0)
        }
    })));

    manager
        .update_topology(ProviderId::core(), &example_description(1), vec![])
        .unwrap();
    assert_eq!(manager.current_topology().get_paths(&did(1), &did(3)).len(), 1);

    manager.set_default_weigher(None);
    manager
        .update_topology(ProviderId::core(), &example_description(2), vec![])
        .unwrap();
    assert_eq!(manager.current_topology().get_paths(&did(1), &did(3)).len(), 2);
    dispatcher.stop();
}

#[test]
fn test_max_paths_from_config() {
    let (manager, dispatcher) = setup(TopologyConfig {
        max_paths: 1,
        ..TopologyConfig::default()
    });

    manager
        .update_topology(ProviderId::core(), &example_description(1), vec![])
        .unwrap();
    assert_eq!(manager.current_topology().get_paths(&did(1), &did(3)).len(), 1);
    dispatcher.stop();
}
