use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::*;
use crate::cluster::LocalClusterHub;
use crate::event::Event;
use crate::store::StoreDelegate;
use crate::test_utils::cluster_member;
use crate::test_utils::did;
use crate::test_utils::node;
use crate::test_utils::wait_until;
use crate::EcMapConfig;
use crate::Error;
use crate::StoreError;

#[derive(Default)]
struct Recorder(Mutex<Vec<RegionEvent>>);

impl StoreDelegate<RegionEvent> for Recorder {
    fn notify(
        &self,
        event: RegionEvent,
    ) {
        self.0.lock().push(event);
    }
}

impl Recorder {
    fn take(&self) -> Vec<(RegionEventType, RegionId, usize)> {
        self.0
            .lock()
            .drain(..)
            .map(|e| (e.event_type(), e.subject().id().clone(), e.devices().len()))
            .collect()
    }
}

fn rid(id: &str) -> RegionId {
    RegionId::new(id)
}

fn store(
    hub: &LocalClusterHub,
    local: &str,
    members: &[&str],
) -> RegionStore {
    let (communicator, cluster) = cluster_member(hub, local, members);
    let config = EcMapConfig {
        anti_entropy_period_ms: 3_600_000,
        tombstones_enabled: true,
        purge_period_ms: 3_600_000,
    };
    RegionStore::build(communicator, cluster, config).expect("build store")
}

fn single() -> RegionStore {
    store(&LocalClusterHub::new(), "a", &["a"])
}

fn store_with_regions(ids: &[&str]) -> (RegionStore, Arc<Recorder>) {
    let store = single();
    for id in ids {
        store
            .create_region(rid(id), format!("Region {id}"), RegionType::Metro, Vec::new())
            .unwrap();
    }
    let recorder = Arc::new(Recorder::default());
    store.set_delegate(recorder.clone());
    (store, recorder)
}

#[tokio::test]
async fn test_create_and_get_region() {
    let store = single();
    let recorder = Arc::new(Recorder::default());
    store.set_delegate(recorder.clone());

    let masters = vec![BTreeSet::from([node("a"), node("b")]), BTreeSet::from([node("c")])];
    let region = store
        .create_region(rid("r1"), "Campus 1", RegionType::Campus, masters.clone())
        .unwrap();

    assert_eq!(region.name(), "Campus 1");
    assert_eq!(region.masters(), masters.as_slice());
    assert_eq!(store.get_region(&rid("r1")).unwrap(), Some(region));
    assert_eq!(store.get_regions().unwrap().len(), 1);
    assert!(store.get_region(&rid("r2")).unwrap().is_none());
    assert_eq!(recorder.take(), vec![(RegionEventType::RegionAdded, rid("r1"), 0)]);
}

#[tokio::test]
async fn test_duplicate_create_fails() {
    let (store, recorder) = store_with_regions(&["r1"]);

    let result = store.create_region(rid("r1"), "again", RegionType::Room, Vec::new());
    assert!(matches!(
        result,
        Err(Error::Store(StoreError::AlreadyExists { kind: "Region", .. }))
    ));
    assert_eq!(store.get_region(&rid("r1")).unwrap().unwrap().region_type(), RegionType::Metro);
    assert!(recorder.take().is_empty());
}

#[tokio::test]
async fn test_update_region() {
    let (store, recorder) = store_with_regions(&["r1"]);

    let updated = store
        .update_region(&rid("r1"), "Renamed", RegionType::Metro, Vec::new())
        .unwrap();
    assert_eq!(updated.name(), "Renamed");
    assert_eq!(store.get_region(&rid("r1")).unwrap().unwrap().name(), "Renamed");

    // Identical update is not a change
    store
        .update_region(&rid("r1"), "Renamed", RegionType::Metro, Vec::new())
        .unwrap();
    assert_eq!(recorder.take(), vec![(RegionEventType::RegionUpdated, rid("r1"), 0)]);

    let missing = store.update_region(&rid("nope"), "x", RegionType::Metro, Vec::new());
    assert!(matches!(
        missing,
        Err(Error::Store(StoreError::ItemNotFound { kind: "Region", .. }))
    ));
}

#[tokio::test]
async fn test_device_membership() {
    let (store, recorder) = store_with_regions(&["r1"]);

    store.add_devices(&rid("r1"), [did(1), did(2)]).unwrap();
    assert_eq!(store.get_region_devices(&rid("r1")).unwrap(), BTreeSet::from([did(1), did(2)]));
    assert_eq!(store.get_region_for_device(&did(1)).unwrap().unwrap().id(), &rid("r1"));
    assert!(store.get_region_for_device(&did(3)).unwrap().is_none());

    // Adding members again changes nothing
    store.add_devices(&rid("r1"), [did(1)]).unwrap();

    store.remove_devices(&rid("r1"), [did(1), did(9)]).unwrap();
    assert!(store.get_region_for_device(&did(1)).unwrap().is_none());
    assert_eq!(store.get_region_devices(&rid("r1")).unwrap(), BTreeSet::from([did(2)]));

    // One event per device joining or leaving
    assert_eq!(
        recorder.take(),
        vec![
            (RegionEventType::RegionMembershipChanged, rid("r1"), 1),
            (RegionEventType::RegionMembershipChanged, rid("r1"), 2),
            (RegionEventType::RegionMembershipChanged, rid("r1"), 1),
        ]
    );
}

#[tokio::test]
async fn test_membership_on_unknown_region_fails() {
    let store = single();

    assert!(matches!(
        store.add_devices(&rid("r1"), [did(1)]),
        Err(Error::Store(StoreError::ItemNotFound { kind: "Region", .. }))
    ));
    assert!(store.remove_devices(&rid("r1"), [did(1)]).is_err());
    assert!(store.get_region_for_device(&did(1)).unwrap().is_none());
    assert!(store.get_region_devices(&rid("r1")).unwrap().is_empty());
}

/// # Case 1: a device added to a second region leaves the first
#[tokio::test]
async fn test_device_moves_between_regions() {
    let (store, recorder) = store_with_regions(&["r1", "r2"]);
    store.add_devices(&rid("r1"), [did(1), did(2)]).unwrap();
    recorder.take();

    store.add_devices(&rid("r2"), [did(1)]).unwrap();

    assert_eq!(store.get_region_for_device(&did(1)).unwrap().unwrap().id(), &rid("r2"));
    assert_eq!(store.get_region_devices(&rid("r1")).unwrap(), BTreeSet::from([did(2)]));
    assert_eq!(store.get_region_devices(&rid("r2")).unwrap(), BTreeSet::from([did(1)]));
    assert_eq!(
        recorder.take(),
        vec![
            (RegionEventType::RegionMembershipChanged, rid("r1"), 1),
            (RegionEventType::RegionMembershipChanged, rid("r2"), 1),
        ]
    );

    // Removing from the old region no longer touches the device
    store.remove_devices(&rid("r1"), [did(1)]).unwrap();
    assert_eq!(store.get_region_for_device(&did(1)).unwrap().unwrap().id(), &rid("r2"));
    assert!(recorder.take().is_empty());
}

#[tokio::test]
async fn test_remove_region_releases_devices() {
    let (store, recorder) = store_with_regions(&["r1"]);
    store.add_devices(&rid("r1"), [did(1)]).unwrap();
    recorder.take();

    let removed = store.remove_region(&rid("r1")).unwrap().unwrap();
    assert_eq!(removed.id(), &rid("r1"));
    assert!(store.get_region_for_device(&did(1)).unwrap().is_none());
    assert!(store.get_region_devices(&rid("r1")).unwrap().is_empty());
    assert!(store.remove_region(&rid("r1")).unwrap().is_none());
    assert_eq!(recorder.take(), vec![(RegionEventType::RegionRemoved, rid("r1"), 1)]);
}

/// # Case 2: readers never see a moving device in no region or in both
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_moves_are_atomic_for_readers() {
    let (store, _recorder) = store_with_regions(&["r1", "r2"]);
    let store = Arc::new(store);
    store.add_devices(&rid("r1"), [did(1)]).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let store = store.clone();
        let done = done.clone();
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let region = store
                    .get_region_for_device(&did(1))
                    .unwrap()
                    .expect("device in a region");
                assert!(region.id() == &rid("r1") || region.id() == &rid("r2"));
            }
        })
    };

    for i in 0..500 {
        let target = if i % 2 == 0 { "r2" } else { "r1" };
        store.add_devices(&rid(target), [did(1)]).unwrap();
        let r1 = store.get_region_devices(&rid("r1")).unwrap();
        let r2 = store.get_region_devices(&rid("r2")).unwrap();
        assert!(r1.contains(&did(1)) != r2.contains(&did(1)));
    }
    done.store(true, Ordering::Release);
    reader.join().unwrap();
}

/// # Case 3: regions and memberships created on one node reach the other
/// node's store
#[tokio::test]
async fn test_regions_replicate_between_nodes() {
    let hub = LocalClusterHub::new();
    let members = ["a", "b"];
    let a = store(&hub, "a", &members);
    let b = store(&hub, "b", &members);
    let recorder = Arc::new(Recorder::default());
    b.set_delegate(recorder.clone());

    a.create_region(rid("r1"), "Rack 1", RegionType::Rack, Vec::new()).unwrap();
    a.create_region(rid("r2"), "Rack 2", RegionType::Rack, Vec::new()).unwrap();
    a.add_devices(&rid("r1"), [did(1)]).unwrap();
    a.add_devices(&rid("r2"), [did(1)]).unwrap();

    let moved = || {
        b.get_region_for_device(&did(1))
            .unwrap()
            .is_some_and(|region| region.id() == &rid("r2"))
    };
    assert!(wait_until(Duration::from_secs(2), moved).await);
    assert!(b.get_region_devices(&rid("r1")).unwrap().is_empty());

    // The two maps replicate independently, so only the outcome is fixed
    let events = recorder.take();
    let added: Vec<_> = events
        .iter()
        .filter(|(event_type, _, _)| *event_type == RegionEventType::RegionAdded)
        .map(|(_, id, _)| id.clone())
        .collect();
    assert_eq!(added, vec![rid("r1"), rid("r2")]);
    assert!(events.iter().any(|(_, id, devices)| id == &rid("r2") && *devices == 1));

    a.destroy();
    b.destroy();
}
