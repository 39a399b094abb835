use std::collections::VecDeque;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::GraphDescription;
use super::LinkWeigher;
use super::Topology;
use super::TopologyDelta;
use super::TopologyEvent;
use crate::event::EventDispatcher;
use crate::event::EventListener;
use crate::event::ListenerId;
use crate::event::ListenerRegistry;
use crate::net::ProviderId;
use crate::Result;
use crate::TopologyConfig;
use crate::TopologyMetrics;

/// Owns the current topology snapshot.
///
/// Readers get the live `Arc<Topology>` without locking; writers build the
/// next snapshot off to the side and swap it in.
pub struct TopologyManager {
    config: TopologyConfig,
    current: ArcSwap<Topology>,
    /// Serializes snapshot replacement
    update_lock: Mutex<()>,
    dispatcher: EventDispatcher,
    listeners: Arc<ListenerRegistry<TopologyEvent>>,
    default_weigher: RwLock<Option<Arc<dyn LinkWeigher>>>,
    history: Mutex<VecDeque<TopologyEvent>>,
    metrics: TopologyMetrics,
}

impl std::fmt::Debug for TopologyManager {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TopologyManager")
            .field("config", &self.config)
            .field("current", &self.current.load_full())
            .finish_non_exhaustive()
    }
}

impl TopologyManager {
    /// Creates the manager and registers its listener registry as the sink
    /// for [`TopologyEvent`]s on `dispatcher`.
    pub fn new(
        config: TopologyConfig,
        dispatcher: EventDispatcher,
    ) -> Self {
        let listeners = Arc::new(ListenerRegistry::new());
        dispatcher.add_sink::<TopologyEvent, _>(listeners.clone());

        let initial = Topology::build(ProviderId::core(), &GraphDescription::empty(), None)
            .with_max_paths(config.max_paths);

        Self {
            config,
            current: ArcSwap::from_pointee(initial),
            update_lock: Mutex::new(()),
            dispatcher,
            listeners,
            default_weigher: RwLock::new(None),
            history: Mutex::new(VecDeque::new()),
            metrics: TopologyMetrics::new(),
        }
    }

    pub fn current_topology(&self) -> Arc<Topology> {
        self.current.load_full()
    }

    /// True when `topology` is the snapshot currently in effect.
    pub fn is_latest(
        &self,
        topology: &Arc<Topology>,
    ) -> bool {
        Arc::ptr_eq(&self.current.load(), topology)
    }

    /// Weigher baked into snapshots built from now on. `None` restores hop
    /// count.
    pub fn set_default_weigher(
        &self,
        weigher: Option<Arc<dyn LinkWeigher>>,
    ) {
        *self.default_weigher.write() = weigher;
    }

    /// Builds and installs a snapshot for `description`.
    ///
    /// Descriptions older than the current snapshot are ignored and yield
    /// `Ok(None)`. Otherwise the emitted event is posted to the dispatcher and
    /// returned. A failed post is logged and counted by the dispatcher; the
    /// new snapshot and its history entry stay in place.
    pub fn update_topology(
        &self,
        provider_id: ProviderId,
        description: &GraphDescription,
        reasons: Vec<String>,
    ) -> Result<Option<TopologyEvent>> {
        let _guard = self.update_lock.lock();

        let previous = self.current.load_full();
        if description.time() < previous.time() {
            debug!(
                received = description.time(),
                current = previous.time(),
                "Ignoring stale graph description"
            );
            return Ok(None);
        }

        let weigher = self.default_weigher.read().clone();
        let next = Arc::new(
            Topology::build(provider_id, description, weigher).with_max_paths(self.config.max_paths),
        );
        let delta = TopologyDelta::between(&previous, &next);
        self.current.store(next.clone());

        self.record_metrics(&next);
        info!(
            devices = next.device_count(),
            links = next.link_count(),
            clusters = next.cluster_count(),
            "Topology changed"
        );

        let event = TopologyEvent::new(next, delta, reasons);
        {
            let mut history = self.history.lock();
            if history.len() == self.config.event_history_size {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        if let Err(e) = self.dispatcher.post(event.clone()) {
            warn!("Topology event not delivered: {:?}", e);
        }
        Ok(Some(event))
    }

    fn record_metrics(
        &self,
        topology: &Topology,
    ) {
        self.metrics.events.inc();
        self.metrics.last_event_time_ms.set(topology.creation_time() as i64);
        self.metrics.last_compute_cost_ns.set(topology.compute_cost() as i64);
        self.metrics.devices.set(topology.device_count() as i64);
        self.metrics.links.set(topology.link_count() as i64);
        self.metrics.clusters.set(topology.cluster_count() as i64);
    }

    /// Up to `count` most recent events, oldest first.
    pub fn recent_events(
        &self,
        count: usize,
    ) -> Vec<TopologyEvent> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(count);
        history.iter().skip(skip).cloned().collect()
    }

    pub fn metrics(&self) -> &TopologyMetrics {
        &self.metrics
    }

    pub fn add_listener(
        &self,
        listener: Arc<dyn EventListener<TopologyEvent>>,
    ) -> ListenerId {
        self.listeners.add_listener(listener)
    }

    pub fn remove_listener(
        &self,
        id: ListenerId,
    ) -> bool {
        self.listeners.remove_listener(id)
    }
}
