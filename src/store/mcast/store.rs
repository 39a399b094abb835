use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::info;

use super::McastEvent;
use super::McastEventType;
use super::McastRoute;
use super::McastRouteData;
use super::McastRouteUpdate;
use crate::cluster::ClusterCommunicator;
use crate::cluster::ClusterService;
use crate::event::Event;
use crate::event::ListenerId;
use crate::net::ConnectPoint;
use crate::store::DelegateSlot;
use crate::store::EcMapEvent;
use crate::store::EcMapEventType;
use crate::store::EventuallyConsistentMap;
use crate::store::StoreDelegate;
use crate::EcMapConfig;
use crate::Result;
use crate::StoreError;

const MAP_NAME: &str = "mcast-routes";
const ROUTE: &str = "McastRoute";

#[derive(Debug, Clone, Copy)]
enum Endpoints {
    Sources,
    Sinks,
}

impl Endpoints {
    fn of(
        self,
        data: &mut McastRouteData,
    ) -> &mut BTreeSet<ConnectPoint> {
        match self {
            Endpoints::Sources => &mut data.sources,
            Endpoints::Sinks => &mut data.sinks,
        }
    }
}

/// Route state last reported to the delegate.
///
/// Map events only carry the new value; the previous one comes from here.
#[derive(Debug, Default)]
struct Reported {
    routes: Mutex<HashMap<McastRoute, McastRouteData>>,
}

impl Reported {
    fn on_map_event(
        &self,
        event: &EcMapEvent<McastRoute, McastRouteData>,
    ) -> Vec<McastEvent> {
        let route = event.key();
        let data = event.value();
        match event.event_type() {
            EcMapEventType::Put => {
                let previous = self.routes.lock().insert(route.clone(), data.clone());
                match previous {
                    None => vec![McastEvent::new(
                        McastEventType::RouteAdded,
                        McastRouteUpdate::new(route.clone(), data.clone()),
                        None,
                    )],
                    Some(previous) => endpoint_events(route, &previous, data),
                }
            }
            EcMapEventType::Remove => {
                let previous = self.routes.lock().remove(route).unwrap_or_else(|| data.clone());
                vec![McastEvent::new(
                    McastEventType::RouteRemoved,
                    McastRouteUpdate::new(route.clone(), McastRouteData::default()),
                    Some(McastRouteUpdate::new(route.clone(), previous)),
                )]
            }
        }
    }
}

/// One event per kind of endpoint change between `previous` and `current`.
fn endpoint_events(
    route: &McastRoute,
    previous: &McastRouteData,
    current: &McastRouteData,
) -> Vec<McastEvent> {
    let changes = [
        (
            McastEventType::SourcesAdded,
            current.sources.difference(&previous.sources).next().is_some(),
        ),
        (
            McastEventType::SourcesRemoved,
            previous.sources.difference(&current.sources).next().is_some(),
        ),
        (
            McastEventType::SinksAdded,
            current.sinks.difference(&previous.sinks).next().is_some(),
        ),
        (
            McastEventType::SinksRemoved,
            previous.sinks.difference(&current.sinks).next().is_some(),
        ),
    ];
    changes
        .into_iter()
        .filter(|(_, changed)| *changed)
        .map(|(event_type, _)| {
            McastEvent::new(
                event_type,
                McastRouteUpdate::new(route.clone(), current.clone()),
                Some(McastRouteUpdate::new(route.clone(), previous.clone())),
            )
        })
        .collect()
}

/// Multicast routing table replicated across the cluster.
///
/// Local and remote changes both reach the delegate through the replicated
/// map's listener.
#[derive(Debug)]
pub struct McastStore {
    routes: EventuallyConsistentMap<McastRoute, McastRouteData>,
    delegate: Arc<DelegateSlot<McastEvent>>,
    listener_id: ListenerId,
}

impl McastStore {
    /// Wraps an existing map.
    pub fn new(routes: EventuallyConsistentMap<McastRoute, McastRouteData>) -> Self {
        let delegate: Arc<DelegateSlot<McastEvent>> = Arc::new(DelegateSlot::default());
        let reported = Reported::default();
        let slot = delegate.clone();
        let listener_id = routes.add_listener(Arc::new(
            move |event: &EcMapEvent<McastRoute, McastRouteData>| {
                for event in reported.on_map_event(event) {
                    slot.notify(event);
                }
            },
        ));
        Self {
            routes,
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
        let routes = EventuallyConsistentMap::<McastRoute, McastRouteData>::builder()
            .with_name(MAP_NAME)
            .with_communicator(communicator)
            .with_cluster_service(cluster)
            .with_config(config)
            .build()?;
        Ok(Self::new(routes))
    }

    pub fn set_delegate(
        &self,
        delegate: Arc<dyn StoreDelegate<McastEvent>>,
    ) {
        self.delegate.set(delegate);
    }

    pub fn unset_delegate(&self) {
        self.delegate.unset();
    }

    /// Adds `route` with no endpoints. Returns false if it already exists.
    pub fn add_route(
        &self,
        route: McastRoute,
    ) -> Result<bool> {
        let mut added = false;
        self.routes.compute(route.clone(), |_, current| match current {
            Some(data) => Some(data.clone()),
            None => {
                added = true;
                Some(McastRouteData::default())
            }
        })?;
        if added {
            info!(%route, "Multicast route added");
        }
        Ok(added)
    }

    /// Removes `route` together with its endpoints.
    pub fn remove_route(
        &self,
        route: &McastRoute,
    ) -> Result<Option<McastRouteData>> {
        let removed = self.routes.remove(route)?;
        if let Some(data) = &removed {
            info!(%route, sources = data.sources.len(), sinks = data.sinks.len(), "Multicast route removed");
        }
        Ok(removed)
    }

    pub fn get_route(
        &self,
        route: &McastRoute,
    ) -> Result<Option<McastRouteData>> {
        self.routes.get(route)
    }

    /// All routes, ordered.
    pub fn get_routes(&self) -> Result<BTreeSet<McastRoute>> {
        Ok(self.routes.keys()?.into_iter().collect())
    }

    pub fn get_sources(
        &self,
        route: &McastRoute,
    ) -> Result<BTreeSet<ConnectPoint>> {
        Ok(self.routes.get(route)?.map(|data| data.sources).unwrap_or_default())
    }

    pub fn get_sinks(
        &self,
        route: &McastRoute,
    ) -> Result<BTreeSet<ConnectPoint>> {
        Ok(self.routes.get(route)?.map(|data| data.sinks).unwrap_or_default())
    }

    /// Routes `connect_point` takes part in, as source or sink.
    pub fn get_routes_for(
        &self,
        connect_point: &ConnectPoint,
    ) -> Result<BTreeSet<McastRoute>> {
        Ok(self
            .routes
            .entries()?
            .into_iter()
            .filter(|(_, data)| data.sources.contains(connect_point) || data.sinks.contains(connect_point))
            .map(|(route, _)| route)
            .collect())
    }

    /// Fails with `ItemNotFound` for unknown routes.
    pub fn add_sources(
        &self,
        route: &McastRoute,
        sources: impl IntoIterator<Item = ConnectPoint>,
    ) -> Result<()> {
        self.update(route, Endpoints::Sources, |set| {
            for point in sources {
                set.insert(point);
            }
        })
    }

    pub fn remove_sources(
        &self,
        route: &McastRoute,
        sources: impl IntoIterator<Item = ConnectPoint>,
    ) -> Result<()> {
        self.update(route, Endpoints::Sources, |set| {
            for point in sources {
                set.remove(&point);
            }
        })
    }

    pub fn add_sinks(
        &self,
        route: &McastRoute,
        sinks: impl IntoIterator<Item = ConnectPoint>,
    ) -> Result<()> {
        self.update(route, Endpoints::Sinks, |set| {
            for point in sinks {
                set.insert(point);
            }
        })
    }

    pub fn remove_sinks(
        &self,
        route: &McastRoute,
        sinks: impl IntoIterator<Item = ConnectPoint>,
    ) -> Result<()> {
        self.update(route, Endpoints::Sinks, |set| {
            for point in sinks {
                set.remove(&point);
            }
        })
    }

    /// Applies `change` to one endpoint set of the route under the map's
    /// entry lock. Unchanged data is not written.
    fn update(
        &self,
        route: &McastRoute,
        endpoints: Endpoints,
        change: impl FnOnce(&mut BTreeSet<ConnectPoint>),
    ) -> Result<()> {
        let updated = self.routes.compute(route.clone(), |_, current| {
            let mut data = current?.clone();
            change(endpoints.of(&mut data));
            Some(data)
        })?;
        if updated.is_none() {
            return Err(StoreError::ItemNotFound {
                kind: ROUTE,
                id: route.to_string(),
            }
            .into());
        }
        debug!(%route, ?endpoints, "Multicast route updated");
        Ok(())
    }

    /// Detaches from and destroys the backing map.
    pub fn destroy(&self) {
        self.routes.remove_listener(self.listener_id);
        self.routes.destroy();
    }
}
