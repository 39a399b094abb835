use std::sync::Arc;

use tracing::debug;

use super::DhcpRecord;
use super::DhcpRelayEvent;
use super::DhcpRelayEventType;
use crate::cluster::ClusterCommunicator;
use crate::cluster::ClusterService;
use crate::event::Event;
use crate::event::ListenerId;
use crate::net::HostId;
use crate::store::DelegateSlot;
use crate::store::EcMapEvent;
use crate::store::EcMapEventType;
use crate::store::EventuallyConsistentMap;
use crate::store::StoreDelegate;
use crate::EcMapConfig;
use crate::Result;

const MAP_NAME: &str = "dhcp-relay";

/// DHCP records replicated across the cluster.
///
/// The delegate hears about every accepted change, local or remote, from
/// the replicated map's listener.
#[derive(Debug)]
pub struct DhcpRelayStore {
    records: EventuallyConsistentMap<HostId, DhcpRecord>,
    delegate: Arc<DelegateSlot<DhcpRelayEvent>>,
    listener_id: ListenerId,
}

impl DhcpRelayStore {
    /// Wraps an existing map.
    pub fn new(records: EventuallyConsistentMap<HostId, DhcpRecord>) -> Self {
        let delegate: Arc<DelegateSlot<DhcpRelayEvent>> = Arc::new(DelegateSlot::default());
        let slot = delegate.clone();
        let listener_id = records.add_listener(Arc::new(move |event: &EcMapEvent<HostId, DhcpRecord>| {
            let event_type = match event.event_type() {
                EcMapEventType::Put => DhcpRelayEventType::Updated,
                EcMapEventType::Remove => DhcpRelayEventType::Removed,
            };
            slot.notify(DhcpRelayEvent::new(event_type, event.value().clone()));
        }));
        Self {
            records,
            delegate,
            listener_id,
        }
    }

    /// Builds the backing map on the current tokio runtime.
    pub fn build(
        communicator: Arc<dyn ClusterCommunicator>,
        cluster: Arc<dyn ClusterService>,
        config: EcMapConfig,
    ) -> Result<Self> {
        let records = EventuallyConsistentMap::<HostId, DhcpRecord>::builder()
            .with_name(MAP_NAME)
            .with_communicator(communicator)
            .with_cluster_service(cluster)
            .with_config(config)
            .build()?;
        Ok(Self::new(records))
    }

    pub fn set_delegate(
        &self,
        delegate: Arc<dyn StoreDelegate<DhcpRelayEvent>>,
    ) {
        self.delegate.set(delegate);
    }

    pub fn unset_delegate(&self) {
        self.delegate.unset();
    }

    pub fn update_dhcp_record(
        &self,
        host_id: HostId,
        record: DhcpRecord,
    ) -> Result<()> {
        debug!(%host_id, "Updating DHCP record");
        self.records.put(host_id, record)
    }

    pub fn get_dhcp_record(
        &self,
        host_id: &HostId,
    ) -> Result<Option<DhcpRecord>> {
        self.records.get(host_id)
    }

    pub fn get_dhcp_records(&self) -> Result<Vec<DhcpRecord>> {
        self.records.values()
    }

    pub fn remove_dhcp_record(
        &self,
        host_id: &HostId,
    ) -> Result<Option<DhcpRecord>> {
        debug!(%host_id, "Removing DHCP record");
        self.records.remove(host_id)
    }

    /// Detaches from and destroys the backing map.
    pub fn destroy(&self) {
        self.records.remove_listener(self.listener_id);
        self.records.destroy();
    }
}
