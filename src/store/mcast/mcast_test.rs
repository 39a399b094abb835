use std::collections::BTreeSet;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::*;
use crate::cluster::LocalClusterHub;
use crate::event::Event;
use crate::store::MockStoreDelegate;
use crate::store::StoreDelegate;
use crate::test_utils::cluster_member;
use crate::test_utils::cp;
use crate::test_utils::wait_until;
use crate::EcMapConfig;
use crate::Error;
use crate::StoreError;

#[derive(Default)]
struct Recorder(Mutex<Vec<McastEvent>>);

impl StoreDelegate<McastEvent> for Recorder {
    fn notify(
        &self,
        event: McastEvent,
    ) {
        self.0.lock().push(event);
    }
}

impl Recorder {
    fn types(&self) -> Vec<McastEventType> {
        self.0.lock().iter().map(|e| e.event_type()).collect()
    }
}

fn store(
    hub: &LocalClusterHub,
    local: &str,
    members: &[&str],
) -> McastStore {
    let (communicator, cluster) = cluster_member(hub, local, members);
    let config = EcMapConfig {
        anti_entropy_period_ms: 3_600_000,
        tombstones_enabled: true,
        purge_period_ms: 3_600_000,
    };
    McastStore::build(communicator, cluster, config).expect("build store")
}

fn single() -> McastStore {
    store(&LocalClusterHub::new(), "a", &["a"])
}

fn group(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(239, 0, 0, last))
}

fn route(last: u8) -> McastRoute {
    McastRoute::new(Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))), group(last), McastRouteType::Igmp)
}

#[test]
fn test_route_display() {
    assert_eq!(route(1).to_string(), "(10.0.0.1, 239.0.0.1)");
    let any_source = McastRoute::new(None, group(2), McastRouteType::Static);
    assert_eq!(any_source.to_string(), "(*, 239.0.0.2)");
    assert_ne!(any_source, McastRoute::new(None, group(2), McastRouteType::Pim));
}

#[tokio::test]
async fn test_add_and_remove_route() {
    let store = single();
    let recorder = Arc::new(Recorder::default());
    store.set_delegate(recorder.clone());

    assert!(store.add_route(route(1)).unwrap());
    assert!(!store.add_route(route(1)).unwrap());
    assert_eq!(store.get_routes().unwrap(), BTreeSet::from([route(1)]));
    assert_eq!(store.get_route(&route(1)).unwrap(), Some(McastRouteData::default()));

    store.add_sinks(&route(1), [cp(2, 1)]).unwrap();
    let removed = store.remove_route(&route(1)).unwrap().unwrap();
    assert_eq!(removed.sinks(), &BTreeSet::from([cp(2, 1)]));
    assert!(store.remove_route(&route(1)).unwrap().is_none());
    assert!(store.get_routes().unwrap().is_empty());

    assert_eq!(
        recorder.types(),
        vec![
            McastEventType::RouteAdded,
            McastEventType::SinksAdded,
            McastEventType::RouteRemoved,
        ]
    );
    let events = recorder.0.lock();
    assert!(events[0].previous().is_none());
    assert_eq!(events[2].previous().unwrap().sinks().len(), 1);
    assert!(events[2].subject().sinks().is_empty());
}

#[tokio::test]
async fn test_sources_and_sinks() {
    let store = single();
    store.add_route(route(1)).unwrap();
    let recorder = Arc::new(Recorder::default());
    store.set_delegate(recorder.clone());

    store.add_sources(&route(1), [cp(1, 1)]).unwrap();
    store.add_sinks(&route(1), [cp(2, 1), cp(3, 1)]).unwrap();
    assert_eq!(store.get_sources(&route(1)).unwrap(), BTreeSet::from([cp(1, 1)]));
    assert_eq!(store.get_sinks(&route(1)).unwrap(), BTreeSet::from([cp(2, 1), cp(3, 1)]));

    // Known endpoints are not a change
    store.add_sinks(&route(1), [cp(2, 1)]).unwrap();
    store.remove_sources(&route(1), [cp(9, 9)]).unwrap();

    store.remove_sinks(&route(1), [cp(2, 1)]).unwrap();
    store.remove_sources(&route(1), [cp(1, 1)]).unwrap();
    assert!(store.get_sources(&route(1)).unwrap().is_empty());
    assert_eq!(store.get_sinks(&route(1)).unwrap(), BTreeSet::from([cp(3, 1)]));

    assert_eq!(
        recorder.types(),
        vec![
            McastEventType::SourcesAdded,
            McastEventType::SinksAdded,
            McastEventType::SinksRemoved,
            McastEventType::SourcesRemoved,
        ]
    );

    let events = recorder.0.lock();
    let sinks_removed = &events[2];
    assert_eq!(sinks_removed.previous().unwrap().sinks().len(), 2);
    assert_eq!(sinks_removed.subject().sinks().len(), 1);
    assert_eq!(sinks_removed.subject().route(), &route(1));
}

#[tokio::test]
async fn test_routes_for_connect_point() {
    let store = single();
    store.add_route(route(1)).unwrap();
    store.add_route(route(2)).unwrap();
    store.add_sources(&route(1), [cp(1, 1)]).unwrap();
    store.add_sinks(&route(2), [cp(1, 1)]).unwrap();
    store.add_sinks(&route(2), [cp(4, 1)]).unwrap();

    assert_eq!(store.get_routes_for(&cp(1, 1)).unwrap(), BTreeSet::from([route(1), route(2)]));
    assert_eq!(store.get_routes_for(&cp(4, 1)).unwrap(), BTreeSet::from([route(2)]));
    assert!(store.get_routes_for(&cp(7, 1)).unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_route_fails_without_events() {
    let store = single();
    let mut delegate = MockStoreDelegate::<McastEvent>::new();
    delegate.expect_notify().never();
    store.set_delegate(Arc::new(delegate));

    let result = store.add_sinks(&route(1), [cp(1, 1)]);
    assert!(matches!(
        result,
        Err(Error::Store(StoreError::ItemNotFound { kind: "McastRoute", .. }))
    ));
    assert!(store.remove_sources(&route(1), [cp(1, 1)]).is_err());
    assert!(store.get_sinks(&route(1)).unwrap().is_empty());
    assert!(store.get_route(&route(1)).unwrap().is_none());
}

/// # Case 1: routes and endpoints added on one node reach the other node's
/// delegate with the same event types
#[tokio::test]
async fn test_routes_replicate_between_nodes() {
    let hub = LocalClusterHub::new();
    let members = ["a", "b"];
    let a = store(&hub, "a", &members);
    let b = store(&hub, "b", &members);
    let recorder = Arc::new(Recorder::default());
    b.set_delegate(recorder.clone());

    a.add_route(route(1)).unwrap();
    a.add_sources(&route(1), [cp(1, 1)]).unwrap();
    a.add_sinks(&route(1), [cp(2, 1)]).unwrap();

    assert!(wait_until(Duration::from_secs(2), || b.get_sinks(&route(1)).unwrap().contains(&cp(2, 1))).await);
    assert_eq!(b.get_sources(&route(1)).unwrap(), BTreeSet::from([cp(1, 1)]));
    assert_eq!(
        recorder.types(),
        vec![
            McastEventType::RouteAdded,
            McastEventType::SourcesAdded,
            McastEventType::SinksAdded,
        ]
    );

    a.remove_route(&route(1)).unwrap();
    assert!(wait_until(Duration::from_secs(2), || b.get_routes().unwrap().is_empty()).await);
    assert_eq!(recorder.types().last(), Some(&McastEventType::RouteRemoved));

    a.destroy();
    b.destroy();
}

#[tokio::test]
async fn test_destroyed_store_rejects_operations() {
    let store = single();
    store.destroy();

    assert!(store.add_route(route(1)).is_err());
    assert!(store.get_routes().is_err());
}
