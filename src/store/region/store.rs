use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::info;

use super::Region;
use super::RegionEvent;
use super::RegionEventType;
use super::RegionId;
use super::RegionType;
use crate::cluster::ClusterCommunicator;
use crate::cluster::ClusterService;
use crate::cluster::NodeId;
use crate::event::Event;
use crate::event::ListenerId;
use crate::net::DeviceId;
use crate::store::DelegateSlot;
use crate::store::EcMapEvent;
use crate::store::EcMapEventType;
use crate::store::EventuallyConsistentMap;
use crate::store::StoreDelegate;
use crate::EcMapConfig;
use crate::Result;
use crate::StoreError;

const REGIONS_MAP: &str = "regions";
const MEMBERSHIP_MAP: &str = "region-devices";
const REGION: &str = "Region";

/// Regions and memberships as last reported to the delegate.
///
/// Both map listeners feed it so that every event carries the region and
/// its device set, whichever map the change arrived on.
#[derive(Debug, Default)]
struct Reported {
    regions: HashMap<RegionId, Region>,
    device_regions: HashMap<DeviceId, RegionId>,
}

impl Reported {
    fn members_of(
        &self,
        region_id: &RegionId,
    ) -> BTreeSet<DeviceId> {
        self.device_regions
            .iter()
            .filter(|(_, id)| *id == region_id)
            .map(|(device_id, _)| device_id.clone())
            .collect()
    }

    fn membership_event(
        &self,
        region_id: &RegionId,
    ) -> Option<RegionEvent> {
        let region = self.regions.get(region_id)?.clone();
        Some(RegionEvent::new(
            RegionEventType::RegionMembershipChanged,
            region,
            self.members_of(region_id),
        ))
    }

    fn on_region_event(
        &mut self,
        event: &EcMapEvent<RegionId, Region>,
    ) -> Option<RegionEvent> {
        let region_id = event.key();
        let region = event.value().clone();
        let event_type = match event.event_type() {
            EcMapEventType::Put => match self.regions.insert(region_id.clone(), region.clone()) {
                None => RegionEventType::RegionAdded,
                Some(previous) if previous != region => RegionEventType::RegionUpdated,
                Some(_) => return None,
            },
            EcMapEventType::Remove => {
                self.regions.remove(region_id);
                RegionEventType::RegionRemoved
            }
        };
        Some(RegionEvent::new(event_type, region, self.members_of(region_id)))
    }

    /// Reports the region a device left and the one it joined. Devices of
    /// regions not seen yet are tracked silently.
    fn on_membership_event(
        &mut self,
        event: &EcMapEvent<DeviceId, RegionId>,
    ) -> Vec<RegionEvent> {
        let device_id = event.key();
        let mut touched = BTreeSet::new();
        match event.event_type() {
            EcMapEventType::Put => {
                let region_id = event.value();
                let previous = self.device_regions.insert(device_id.clone(), region_id.clone());
                if previous.as_ref() == Some(region_id) {
                    return Vec::new();
                }
                touched.extend(previous);
                touched.insert(region_id.clone());
            }
            EcMapEventType::Remove => {
                if let Some(previous) = self.device_regions.remove(device_id) {
                    touched.insert(previous);
                }
            }
        }
        touched.iter().filter_map(|id| self.membership_event(id)).collect()
    }
}

/// Region definitions and device membership, replicated across the cluster.
///
/// Membership is keyed by device so a device belongs to at most one region
/// on every replica, and moving it between regions is a single write.
/// Local read-modify-write sequences are serialized by `update_lock`.
#[derive(Debug)]
pub struct RegionStore {
    regions: EventuallyConsistentMap<RegionId, Region>,
    membership: EventuallyConsistentMap<DeviceId, RegionId>,
    update_lock: Mutex<()>,
    delegate: Arc<DelegateSlot<RegionEvent>>,
    listener_ids: (ListenerId, ListenerId),
}

impl RegionStore {
    /// Wraps existing maps.
    pub fn new(
        regions: EventuallyConsistentMap<RegionId, Region>,
        membership: EventuallyConsistentMap<DeviceId, RegionId>,
    ) -> Self {
        let delegate: Arc<DelegateSlot<RegionEvent>> = Arc::new(DelegateSlot::default());
        let reported = Arc::new(Mutex::new(Reported::default()));

        let (slot, view) = (delegate.clone(), reported.clone());
        let regions_listener = regions.add_listener(Arc::new(move |event: &EcMapEvent<RegionId, Region>| {
            let event = view.lock().on_region_event(event);
            if let Some(event) = event {
                slot.notify(event);
            }
        }));

        let (slot, view) = (delegate.clone(), reported);
        let membership_listener =
            membership.add_listener(Arc::new(move |event: &EcMapEvent<DeviceId, RegionId>| {
                let events = view.lock().on_membership_event(event);
                for event in events {
                    slot.notify(event);
                }
            }));

        Self {
            regions,
            membership,
            update_lock: Mutex::new(()),
            delegate,
            listener_ids: (regions_listener, membership_listener),
        }
    }

    /// Builds both backing maps on the current tokio runtime.
    pub fn build(
        communicator: Arc<dyn ClusterCommunicator>,
        cluster: Arc<dyn ClusterService>,
        config: EcMapConfig,
    ) -> Result<Self> {
        let regions = EventuallyConsistentMap::<RegionId, Region>::builder()
            .with_name(REGIONS_MAP)
            .with_communicator(communicator.clone())
            .with_cluster_service(cluster.clone())
            .with_config(config.clone())
            .build()?;
        let membership = EventuallyConsistentMap::<DeviceId, RegionId>::builder()
            .with_name(MEMBERSHIP_MAP)
            .with_communicator(communicator)
            .with_cluster_service(cluster)
            .with_config(config)
            .build()?;
        Ok(Self::new(regions, membership))
    }

    pub fn set_delegate(
        &self,
        delegate: Arc<dyn StoreDelegate<RegionEvent>>,
    ) {
        self.delegate.set(delegate);
    }

    pub fn unset_delegate(&self) {
        self.delegate.unset();
    }

    fn require(
        &self,
        region_id: &RegionId,
    ) -> Result<Region> {
        self.regions.get(region_id)?.ok_or_else(|| {
            StoreError::ItemNotFound {
                kind: REGION,
                id: region_id.to_string(),
            }
            .into()
        })
    }

    /// Fails with `AlreadyExists` when `region_id` is taken.
    pub fn create_region(
        &self,
        region_id: RegionId,
        name: impl Into<String>,
        region_type: RegionType,
        masters: Vec<BTreeSet<NodeId>>,
    ) -> Result<Region> {
        let region = Region::new(region_id.clone(), name, region_type, masters);
        let _guard = self.update_lock.lock();
        if self.regions.contains_key(&region_id)? {
            return Err(StoreError::AlreadyExists {
                kind: REGION,
                id: region_id.to_string(),
            }
            .into());
        }
        self.regions.put(region_id.clone(), region.clone())?;
        info!(region = %region_id, "Region created");
        Ok(region)
    }

    /// Fails with `ItemNotFound` for unknown regions.
    pub fn update_region(
        &self,
        region_id: &RegionId,
        name: impl Into<String>,
        region_type: RegionType,
        masters: Vec<BTreeSet<NodeId>>,
    ) -> Result<Region> {
        let region = Region::new(region_id.clone(), name, region_type, masters);
        let _guard = self.update_lock.lock();
        if self.require(region_id)? == region {
            return Ok(region);
        }
        self.regions.put(region_id.clone(), region.clone())?;
        debug!(region = %region_id, "Region updated");
        Ok(region)
    }

    /// Removes the region and releases its devices. Removing an unknown
    /// region is a no-op.
    pub fn remove_region(
        &self,
        region_id: &RegionId,
    ) -> Result<Option<Region>> {
        let _guard = self.update_lock.lock();
        let Some(region) = self.regions.remove(region_id)? else {
            return Ok(None);
        };
        let devices = self.region_devices(region_id)?;
        for device_id in &devices {
            self.membership.remove_value(device_id, region_id)?;
        }
        info!(region = %region_id, released = devices.len(), "Region removed");
        Ok(Some(region))
    }

    pub fn get_region(
        &self,
        region_id: &RegionId,
    ) -> Result<Option<Region>> {
        self.regions.get(region_id)
    }

    /// All regions, ordered by id.
    pub fn get_regions(&self) -> Result<Vec<Region>> {
        let regions: BTreeMap<RegionId, Region> = self.regions.entries()?.into_iter().collect();
        Ok(regions.into_values().collect())
    }

    pub fn get_region_for_device(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<Region>> {
        match self.membership.get(device_id)? {
            Some(region_id) => self.regions.get(&region_id),
            None => Ok(None),
        }
    }

    pub fn get_region_devices(
        &self,
        region_id: &RegionId,
    ) -> Result<BTreeSet<DeviceId>> {
        self.region_devices(region_id)
    }

    fn region_devices(
        &self,
        region_id: &RegionId,
    ) -> Result<BTreeSet<DeviceId>> {
        Ok(self
            .membership
            .entries()?
            .into_iter()
            .filter(|(_, id)| id == region_id)
            .map(|(device_id, _)| device_id)
            .collect())
    }

    /// Adds devices to a region, taking them out of any region they were in.
    pub fn add_devices(
        &self,
        region_id: &RegionId,
        devices: impl IntoIterator<Item = DeviceId>,
    ) -> Result<()> {
        let _guard = self.update_lock.lock();
        self.require(region_id)?;

        let mut moves = Vec::new();
        for device_id in devices {
            match self.membership.get(&device_id)? {
                Some(current) if current == *region_id => continue,
                Some(current) => {
                    debug!(%device_id, from = %current, to = %region_id, "Device moved between regions");
                }
                None => {}
            }
            moves.push((device_id, region_id.clone()));
        }
        self.membership.put_all(moves)
    }

    /// Removes devices from a region. Devices that are not members are
    /// ignored.
    pub fn remove_devices(
        &self,
        region_id: &RegionId,
        devices: impl IntoIterator<Item = DeviceId>,
    ) -> Result<()> {
        let _guard = self.update_lock.lock();
        self.require(region_id)?;
        for device_id in devices {
            self.membership.remove_value(&device_id, region_id)?;
        }
        Ok(())
    }

    /// Detaches from and destroys both backing maps.
    pub fn destroy(&self) {
        let (regions_listener, membership_listener) = self.listener_ids;
        self.regions.remove_listener(regions_listener);
        self.membership.remove_listener(membership_listener);
        self.regions.destroy();
        self.membership.destroy();
    }
}
