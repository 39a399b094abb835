use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::*;
use crate::cluster::LocalClusterHub;
use crate::event::Event;
use crate::net::HostId;
use crate::store::StoreDelegate;
use crate::test_utils::cluster_member;
use crate::test_utils::cp;
use crate::test_utils::wait_until;
use crate::EcMapConfig;

#[derive(Default)]
struct Recorder(Mutex<Vec<(DhcpRelayEventType, HostId)>>);

impl StoreDelegate<DhcpRelayEvent> for Recorder {
    fn notify(
        &self,
        event: DhcpRelayEvent,
    ) {
        self.0
            .lock()
            .push((event.event_type(), event.subject().host_id().clone()));
    }
}

fn config() -> EcMapConfig {
    EcMapConfig {
        anti_entropy_period_ms: 3_600_000,
        tombstones_enabled: true,
        purge_period_ms: 3_600_000,
    }
}

fn store(
    hub: &LocalClusterHub,
    local: &str,
    members: &[&str],
) -> DhcpRelayStore {
    let (communicator, cluster) = cluster_member(hub, local, members);
    DhcpRelayStore::build(communicator, cluster, config()).expect("build store")
}

fn client(mac: &str) -> DhcpRecord {
    let mut record = DhcpRecord::new(mac, Some(100));
    record
        .add_location(cp(1, 3))
        .set_ip4_status(Dhcp4State::Request)
        .set_directly_connected(true);
    record
}

#[test]
fn test_record_accessors() {
    let mut record = client("aa:bb:cc:dd:ee:01");
    record
        .set_ip4(Ipv4Addr::new(10, 0, 0, 5))
        .set_ip4_status(Dhcp4State::Ack)
        .set_next_hop_temp("00:00:00:00:00:fe")
        .set_next_hop("00:00:00:00:00:fe");

    assert_eq!(record.host_id(), &HostId::from_mac_vlan("aa:bb:cc:dd:ee:01", Some(100)));
    assert_eq!(record.mac(), "AA:BB:CC:DD:EE:01");
    assert_eq!(record.vlan(), Some(100));
    assert_eq!(record.ip4(), Some(Ipv4Addr::new(10, 0, 0, 5)));
    assert_eq!(record.ip4_status(), Some(Dhcp4State::Ack));
    assert_eq!(record.next_hop(), Some("00:00:00:00:00:FE"));
    assert!(record.is_directly_connected());
    assert_eq!(record.locations().count(), 1);

    record.remove_location(&cp(1, 3));
    assert_eq!(record.locations().count(), 0);
    assert!(record.ip6().is_none());
}

#[tokio::test]
async fn test_update_get_remove() {
    let hub = LocalClusterHub::new();
    let store = store(&hub, "a", &["a"]);
    let recorder = Arc::new(Recorder::default());
    store.set_delegate(recorder.clone());

    let record = client("aa:bb:cc:dd:ee:01");
    let host_id = record.host_id().clone();
    store.update_dhcp_record(host_id.clone(), record.clone()).unwrap();

    assert_eq!(store.get_dhcp_record(&host_id).unwrap(), Some(record.clone()));
    assert_eq!(store.get_dhcp_records().unwrap(), vec![record.clone()]);

    assert_eq!(store.remove_dhcp_record(&host_id).unwrap(), Some(record));
    assert!(store.get_dhcp_record(&host_id).unwrap().is_none());
    assert!(store.remove_dhcp_record(&host_id).unwrap().is_none());

    assert_eq!(
        *recorder.0.lock(),
        vec![
            (DhcpRelayEventType::Updated, host_id.clone()),
            (DhcpRelayEventType::Removed, host_id),
        ]
    );
}

#[tokio::test]
async fn test_remote_updates_reach_delegate() {
    let hub = LocalClusterHub::new();
    let members = ["a", "b"];
    let a = store(&hub, "a", &members);
    let b = store(&hub, "b", &members);
    let recorder = Arc::new(Recorder::default());
    b.set_delegate(recorder.clone());

    let record = client("aa:bb:cc:dd:ee:02");
    let host_id = record.host_id().clone();
    a.update_dhcp_record(host_id.clone(), record).unwrap();
    assert!(wait_until(Duration::from_secs(2), || recorder.0.lock().len() == 1).await);

    a.remove_dhcp_record(&host_id).unwrap();
    assert!(wait_until(Duration::from_secs(2), || recorder.0.lock().len() == 2).await);
    assert!(b.get_dhcp_record(&host_id).unwrap().is_none());
    assert_eq!(recorder.0.lock()[1], (DhcpRelayEventType::Removed, host_id));
}

#[tokio::test]
async fn test_destroyed_store_fails() {
    let hub = LocalClusterHub::new();
    let store = store(&hub, "a", &["a"]);
    store.destroy();

    let record = client("aa:bb:cc:dd:ee:03");
    assert!(store
        .update_dhcp_record(record.host_id().clone(), record)
        .is_err());
    assert!(store.get_dhcp_records().is_err());
}
