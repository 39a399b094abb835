use std::collections::HashMap;
use std::fmt;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::messages::EcMapMessage;
use super::messages::UpdateEntry;
use super::Digest;
use super::EcMapData;
use super::EcMapEvent;
use super::EcMapEventType;
use super::EcMapKey;
use super::EcMapListener;
use super::MapValue;
use crate::cluster::ClusterCommunicator;
use crate::cluster::ClusterMessage;
use crate::cluster::ClusterService;
use crate::cluster::NodeId;
use crate::event::ListenerId;
use crate::store::LogicalClock;
use crate::store::TimestampProvider;
use crate::utils::time::get_now_as_millis;
use crate::EcMapConfig;
use crate::Result;
use crate::StoreError;

/// Eventually consistent map replicated to every cluster peer.
///
/// Cloning yields another handle to the same replica.
pub struct EventuallyConsistentMap<K, V> {
    inner: Arc<MapInner<K, V>>,
}

impl<K, V> Clone for EventuallyConsistentMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: EcMapKey, V: EcMapData> fmt::Debug for EventuallyConsistentMap<K, V> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("EventuallyConsistentMap")
            .field("name", &self.inner.name)
            .field("node", &self.inner.local_node)
            .field("entries", &self.inner.items.len())
            .field("destroyed", &self.inner.destroyed.load(Ordering::Acquire))
            .finish()
    }
}

struct MapInner<K, V> {
    name: String,
    subject: String,
    local_node: NodeId,
    items: DashMap<K, MapValue<V>>,
    communicator: Arc<dyn ClusterCommunicator>,
    cluster: Arc<dyn ClusterService>,
    timestamps: Arc<dyn TimestampProvider<K, V>>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn EcMapListener<K, V>>)>>,
    next_listener_id: AtomicU64,
    /// Creation time of the last advertisement each peer acknowledged
    anti_entropy_times: DashMap<NodeId, u64>,
    config: EcMapConfig,
    destroyed: AtomicBool,
    shutdown: CancellationToken,
}

impl<K, V> Drop for MapInner<K, V> {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if !self.destroyed.load(Ordering::Acquire) {
            self.communicator.unsubscribe(&self.subject);
        }
    }
}

/// Assembles an [`EventuallyConsistentMap`].
pub struct EcMapBuilder<K, V> {
    name: Option<String>,
    communicator: Option<Arc<dyn ClusterCommunicator>>,
    cluster: Option<Arc<dyn ClusterService>>,
    timestamps: Option<Arc<dyn TimestampProvider<K, V>>>,
    config: EcMapConfig,
}

impl<K: EcMapKey, V: EcMapData> Default for EcMapBuilder<K, V> {
    fn default() -> Self {
        Self {
            name: None,
            communicator: None,
            cluster: None,
            timestamps: None,
            config: EcMapConfig::default(),
        }
    }
}

impl<K: EcMapKey, V: EcMapData> EcMapBuilder<K, V> {
    pub fn with_name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_communicator(
        mut self,
        communicator: Arc<dyn ClusterCommunicator>,
    ) -> Self {
        self.communicator = Some(communicator);
        self
    }

    pub fn with_cluster_service(
        mut self,
        cluster: Arc<dyn ClusterService>,
    ) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Defaults to a [`LogicalClock`] of the local node.
    pub fn with_timestamp_provider(
        mut self,
        timestamps: Arc<dyn TimestampProvider<K, V>>,
    ) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    pub fn with_config(
        mut self,
        config: EcMapConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Subscribes to the map's subject and starts the receiver and
    /// anti-entropy tasks on the current tokio runtime.
    pub fn build(self) -> Result<EventuallyConsistentMap<K, V>> {
        let name = self
            .name
            .ok_or_else(|| StoreError::IllegalState("replicated map requires a name".into()))?;
        let communicator = self.communicator.ok_or_else(|| {
            StoreError::IllegalState(format!("replicated map {name} requires a cluster communicator"))
        })?;
        let cluster = self.cluster.ok_or_else(|| {
            StoreError::IllegalState(format!("replicated map {name} requires a cluster service"))
        })?;
        self.config.validate()?;
        let runtime = Handle::try_current().map_err(|e| {
            StoreError::IllegalState(format!("replicated map {name} requires a tokio runtime: {e}"))
        })?;

        let local_node = communicator.local_node_id().clone();
        let timestamps = self
            .timestamps
            .unwrap_or_else(|| Arc::new(LogicalClock::new(&local_node)));
        let subject = format!("ecm-{name}");
        let inbox = communicator.subscribe(&subject)?;

        let inner = Arc::new(MapInner {
            name,
            subject,
            local_node,
            items: DashMap::new(),
            communicator,
            cluster,
            timestamps,
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            anti_entropy_times: DashMap::new(),
            config: self.config,
            destroyed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        });

        runtime.spawn(receive_loop(Arc::downgrade(&inner), inbox, inner.shutdown.clone()));
        runtime.spawn(background_loop(
            Arc::downgrade(&inner),
            inner.shutdown.clone(),
            inner.config.anti_entropy_period(),
            inner.config.purge_period(),
            inner.config.tombstones_enabled,
        ));

        info!(map = %inner.name, node = %inner.local_node, "Replicated map started");
        Ok(EventuallyConsistentMap { inner })
    }
}

async fn receive_loop<K: EcMapKey, V: EcMapData>(
    inner: Weak<MapInner<K, V>>,
    mut inbox: mpsc::UnboundedReceiver<ClusterMessage>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            message = inbox.recv() => {
                let Some(message) = message else {
                    debug!("Replicated map inbox closed");
                    break;
                };
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.handle_message(message);
            }
        }
    }
}

async fn background_loop<K: EcMapKey, V: EcMapData>(
    inner: Weak<MapInner<K, V>>,
    shutdown: CancellationToken,
    anti_entropy_period: Duration,
    purge_period: Duration,
    purge_enabled: bool,
) {
    let mut anti_entropy = tokio::time::interval(anti_entropy_period);
    anti_entropy.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut purge = tokio::time::interval(purge_period);
    purge.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Both intervals fire immediately on the first tick
    anti_entropy.tick().await;
    purge.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = anti_entropy.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.run_anti_entropy();
            }
            _ = purge.tick(), if purge_enabled => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.purge_tombstones();
            }
        }
    }
}

impl<K: EcMapKey, V: EcMapData> EventuallyConsistentMap<K, V> {
    pub fn builder() -> EcMapBuilder<K, V> {
        EcMapBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Number of live (non-tombstone) entries
    pub fn size(&self) -> Result<usize> {
        self.inner.check_destroyed()?;
        Ok(self.inner.items.iter().filter(|e| e.value().is_alive()).count())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    pub fn contains_key(
        &self,
        key: &K,
    ) -> Result<bool> {
        self.inner.check_destroyed()?;
        Ok(self.inner.items.get(key).is_some_and(|v| v.is_alive()))
    }

    pub fn contains_value(
        &self,
        value: &V,
    ) -> Result<bool> {
        self.inner.check_destroyed()?;
        Ok(self.inner.items.iter().any(|e| e.value().get() == Some(value)))
    }

    pub fn get(
        &self,
        key: &K,
    ) -> Result<Option<V>> {
        self.inner.check_destroyed()?;
        Ok(self.inner.items.get(key).and_then(|v| v.get().cloned()))
    }

    pub fn keys(&self) -> Result<Vec<K>> {
        self.inner.check_destroyed()?;
        Ok(self
            .inner
            .items
            .iter()
            .filter(|e| e.value().is_alive())
            .map(|e| e.key().clone())
            .collect())
    }

    pub fn values(&self) -> Result<Vec<V>> {
        self.inner.check_destroyed()?;
        Ok(self.inner.items.iter().filter_map(|e| e.value().get().cloned()).collect())
    }

    pub fn entries(&self) -> Result<Vec<(K, V)>> {
        self.inner.check_destroyed()?;
        Ok(self
            .inner
            .items
            .iter()
            .filter_map(|e| e.value().get().map(|v| (e.key().clone(), v.clone())))
            .collect())
    }

    /// Stamps and stores `value`, then pushes it to every peer.
    pub fn put(
        &self,
        key: K,
        value: V,
    ) -> Result<()> {
        self.put_all([(key, value)])
    }

    pub fn put_all(
        &self,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<()> {
        let inner = &self.inner;
        inner.check_destroyed()?;

        let mut updates = Vec::new();
        let mut events = Vec::new();
        for (key, value) in entries {
            let timestamp = inner.timestamps.timestamp(&key, Some(&value));
            let stamped = MapValue::new(value.clone(), timestamp);
            if inner.put_internal(key.clone(), stamped.clone()) {
                events.push(inner.event(EcMapEventType::Put, key.clone(), value));
                updates.push(UpdateEntry { key, value: stamped });
            }
        }
        inner.broadcast(updates);
        inner.notify_listeners(events);
        Ok(())
    }

    /// Writes a tombstone for `key`. Returns the removed value, if any.
    pub fn remove(
        &self,
        key: &K,
    ) -> Result<Option<V>> {
        self.inner.check_destroyed()?;
        Ok(self.inner.local_remove(key, None))
    }

    /// Removes `key` only while it maps to `value`.
    pub fn remove_value(
        &self,
        key: &K,
        value: &V,
    ) -> Result<bool> {
        self.inner.check_destroyed()?;
        Ok(self.inner.local_remove(key, Some(value)).is_some())
    }

    /// Atomically recomputes the entry for `key`. Returning `None` removes it.
    ///
    /// `f` runs under the entry's lock and must not touch this map.
    pub fn compute<F>(
        &self,
        key: K,
        f: F,
    ) -> Result<Option<V>>
    where
        F: FnOnce(&K, Option<&V>) -> Option<V>,
    {
        let inner = &self.inner;
        inner.check_destroyed()?;

        let (stamped, previous) = match inner.items.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get().get().cloned();
                let computed = f(&key, current.as_ref());
                if computed == current {
                    return Ok(computed);
                }
                let stamped = match computed {
                    Some(value) => {
                        let timestamp = inner.timestamps.timestamp(&key, Some(&value));
                        MapValue::new(value, timestamp)
                    }
                    None => MapValue::tombstone(inner.timestamps.timestamp(&key, None)),
                };
                if !stamped.is_newer_than(entry.get()) {
                    return Ok(current);
                }
                if stamped.is_tombstone() && !inner.config.tombstones_enabled {
                    entry.remove();
                } else {
                    entry.insert(stamped.clone());
                }
                (stamped, current)
            }
            Entry::Vacant(entry) => {
                let Some(value) = f(&key, None) else {
                    return Ok(None);
                };
                let timestamp = inner.timestamps.timestamp(&key, Some(&value));
                let stamped = MapValue::new(value, timestamp);
                entry.insert(stamped.clone());
                (stamped, None)
            }
        };

        let result = stamped.get().cloned();
        let event = match (&result, previous) {
            (Some(value), _) => Some(inner.event(EcMapEventType::Put, key.clone(), value.clone())),
            (None, Some(previous)) => Some(inner.event(EcMapEventType::Remove, key.clone(), previous)),
            (None, None) => None,
        };
        inner.broadcast(vec![UpdateEntry { key, value: stamped }]);
        inner.notify_listeners(event);
        Ok(result)
    }

    /// Removes every live entry.
    pub fn clear(&self) -> Result<()> {
        for key in self.keys()? {
            self.inner.local_remove(&key, None);
        }
        Ok(())
    }

    pub fn add_listener(
        &self,
        listener: Arc<dyn EcMapListener<K, V>>,
    ) -> ListenerId {
        let id = ListenerId::new(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, listener));
        id
    }

    pub fn remove_listener(
        &self,
        id: ListenerId,
    ) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Sends this replica's digest to `peer`.
    pub fn advertise_to(
        &self,
        peer: &NodeId,
    ) -> Result<()> {
        self.inner.check_destroyed()?;
        self.inner.advertise_to(peer)
    }

    /// Drops tombstones every peer is known to have seen. Returns how many
    /// were dropped.
    pub fn purge_tombstones(&self) -> Result<usize> {
        self.inner.check_destroyed()?;
        Ok(self.inner.purge_tombstones())
    }

    /// Stops background tasks and leaves the map's subject. Every later
    /// operation fails with [`StoreError::Destroyed`].
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        inner.shutdown.cancel();
        inner.communicator.unsubscribe(&inner.subject);
        inner.listeners.write().clear();
        inner.items.clear();
        info!(map = %inner.name, "Replicated map destroyed");
    }
}

impl<K: EcMapKey, V: EcMapData> MapInner<K, V> {
    fn check_destroyed(&self) -> Result<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(StoreError::Destroyed(self.name.clone()).into());
        }
        Ok(())
    }

    fn event(
        &self,
        event_type: EcMapEventType,
        key: K,
        value: V,
    ) -> EcMapEvent<K, V> {
        EcMapEvent::new(self.name.as_str(), event_type, key, value)
    }

    /// Stores `value` when it is newer than what is held for `key`.
    fn put_internal(
        &self,
        key: K,
        value: MapValue<V>,
    ) -> bool {
        match self.items.entry(key) {
            Entry::Occupied(mut entry) => {
                if value.is_newer_than(entry.get()) {
                    entry.insert(value);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Applies `tombstone` to `key`. With `expected` set, only a live entry
    /// holding that value is removed.
    ///
    /// Returns whether the tombstone was accepted and the live value it
    /// replaced.
    fn remove_internal(
        &self,
        key: K,
        expected: Option<&V>,
        tombstone: MapValue<V>,
    ) -> (bool, Option<V>) {
        match self.items.entry(key) {
            Entry::Vacant(entry) => {
                if expected.is_some() || !self.config.tombstones_enabled {
                    trace!(map = %self.name, "Remove of absent key");
                    return (false, None);
                }
                entry.insert(tombstone);
                (true, None)
            }
            Entry::Occupied(mut entry) => {
                if let Some(expected) = expected {
                    if entry.get().get() != Some(expected) {
                        return (false, None);
                    }
                }
                if !tombstone.is_newer_than(entry.get()) {
                    return (false, None);
                }
                let previous = if self.config.tombstones_enabled {
                    entry.insert(tombstone)
                } else {
                    entry.remove()
                };
                (true, previous.into_value())
            }
        }
    }

    fn local_remove(
        &self,
        key: &K,
        expected: Option<&V>,
    ) -> Option<V> {
        let tombstone = MapValue::tombstone(self.timestamps.timestamp(key, None));
        let (accepted, previous) = self.remove_internal(key.clone(), expected, tombstone.clone());
        if !accepted {
            return None;
        }
        self.broadcast(vec![UpdateEntry {
            key: key.clone(),
            value: tombstone,
        }]);
        if let Some(previous) = &previous {
            self.notify_listeners(Some(self.event(EcMapEventType::Remove, key.clone(), previous.clone())));
        }
        previous
    }

    fn notify_listeners(
        &self,
        events: impl IntoIterator<Item = EcMapEvent<K, V>>,
    ) {
        let listeners = self.listeners.read().clone();
        if listeners.is_empty() {
            return;
        }
        for event in events {
            for (id, listener) in &listeners {
                if catch_unwind(AssertUnwindSafe(|| listener.event(&event))).is_err() {
                    error!(map = %self.name, listener = %id, "Replicated map listener panicked");
                }
            }
        }
    }

    fn send(
        &self,
        peer: &NodeId,
        message: &EcMapMessage<K, V>,
    ) -> Result<()> {
        let payload = message.encode()?;
        self.communicator.unicast(&self.subject, peer, payload)
    }

    /// Pushes `updates` to every peer. Failed sends are left to anti-entropy.
    fn broadcast(
        &self,
        updates: Vec<UpdateEntry<K, V>>,
    ) {
        if updates.is_empty() {
            return;
        }
        let message = EcMapMessage::Updates(updates);
        for peer in self.cluster.peers() {
            if let Err(e) = self.send(&peer, &message) {
                debug!(map = %self.name, %peer, "Failed to push updates: {:?}", e);
            }
        }
    }

    fn handle_message(
        &self,
        message: ClusterMessage,
    ) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }
        let decoded = match EcMapMessage::<K, V>::decode(&message.payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(map = %self.name, sender = %message.sender, "Dropping undecodable message: {:?}", e);
                return;
            }
        };

        match decoded {
            EcMapMessage::Updates(updates) => self.apply_updates(updates),
            EcMapMessage::Advertisement {
                sender,
                created_at,
                digest,
            } => self.handle_advertisement(sender, created_at, digest),
            EcMapMessage::AdvertisementAck { sender, created_at } => {
                let mut time = self.anti_entropy_times.entry(sender).or_insert(0);
                *time = (*time).max(created_at);
            }
            EcMapMessage::UpdateRequest { sender, keys } => {
                let updates: Vec<_> = keys
                    .into_iter()
                    .filter_map(|key| {
                        let value = self.items.get(&key)?.value().clone();
                        Some(UpdateEntry { key, value })
                    })
                    .collect();
                if updates.is_empty() {
                    return;
                }
                if let Err(e) = self.send(&sender, &EcMapMessage::Updates(updates)) {
                    debug!(map = %self.name, peer = %sender, "Failed to answer update request: {:?}", e);
                }
            }
        }
    }

    fn apply_updates(
        &self,
        updates: Vec<UpdateEntry<K, V>>,
    ) {
        let mut events = Vec::new();
        for UpdateEntry { key, value } in updates {
            if value.is_tombstone() {
                let (_, previous) = self.remove_internal(key.clone(), None, value);
                if let Some(previous) = previous {
                    events.push(self.event(EcMapEventType::Remove, key, previous));
                }
            } else if let Some(live) = value.get().cloned() {
                if self.put_internal(key.clone(), value) {
                    events.push(self.event(EcMapEventType::Put, key, live));
                }
            }
        }
        self.notify_listeners(events);
    }

    fn run_anti_entropy(&self) {
        let peers = self.cluster.peers();
        let Some(peer) = peers.choose(&mut rand::thread_rng()) else {
            return;
        };
        if let Err(e) = self.advertise_to(peer) {
            debug!(map = %self.name, %peer, "Anti-entropy advertisement failed: {:?}", e);
        }
    }

    fn advertise_to(
        &self,
        peer: &NodeId,
    ) -> Result<()> {
        // Stamped before the snapshot so every tombstone older than it is in
        // the digest
        let created_at = get_now_as_millis();
        let digest: Vec<_> = self
            .items
            .iter()
            .map(|e| (e.key().clone(), e.value().digest()))
            .collect();
        let advertisement = EcMapMessage::Advertisement {
            sender: self.local_node.clone(),
            created_at,
            digest,
        };
        self.send(peer, &advertisement)
    }

    /// Pushes entries the advertiser lacks or holds older, applies newer
    /// remote tombstones, and requests keys the advertiser holds newer.
    fn handle_advertisement(
        &self,
        sender: NodeId,
        created_at: u64,
        digest: Vec<(K, Digest)>,
    ) {
        let remote: HashMap<K, Digest> = digest.into_iter().collect();
        let local: Vec<(K, MapValue<V>)> = self
            .items
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut push = Vec::new();
        let mut request = Vec::new();
        let mut events = Vec::new();

        for (key, local_value) in &local {
            let local_digest = local_value.digest();
            match remote.get(key) {
                None => push.push(UpdateEntry {
                    key: key.clone(),
                    value: local_value.clone(),
                }),
                Some(remote_digest) if local_digest.is_newer_than(remote_digest) => {
                    push.push(UpdateEntry {
                        key: key.clone(),
                        value: local_value.clone(),
                    })
                }
                Some(remote_digest) if remote_digest.is_newer_than(&local_digest) => {
                    if remote_digest.is_tombstone {
                        let tombstone = MapValue::tombstone(remote_digest.timestamp);
                        let (_, previous) = self.remove_internal(key.clone(), None, tombstone);
                        if let Some(previous) = previous {
                            events.push(self.event(EcMapEventType::Remove, key.clone(), previous));
                        }
                    } else {
                        request.push(key.clone());
                    }
                }
                Some(_) => {}
            }
        }

        for (key, remote_digest) in remote {
            if self.items.contains_key(&key) {
                continue;
            }
            if !remote_digest.is_tombstone {
                request.push(key);
            } else if self.config.tombstones_enabled {
                self.put_internal(key, MapValue::tombstone(remote_digest.timestamp));
            }
        }

        if !push.is_empty() {
            trace!(map = %self.name, peer = %sender, count = push.len(), "Pushing newer entries");
            if let Err(e) = self.send(&sender, &EcMapMessage::Updates(push)) {
                debug!(map = %self.name, peer = %sender, "Failed to push entries: {:?}", e);
            }
        }
        if !request.is_empty() {
            let message = EcMapMessage::UpdateRequest {
                sender: self.local_node.clone(),
                keys: request,
            };
            if let Err(e) = self.send(&sender, &message) {
                debug!(map = %self.name, peer = %sender, "Failed to request entries: {:?}", e);
            }
        }
        let ack = EcMapMessage::AdvertisementAck {
            sender: self.local_node.clone(),
            created_at,
        };
        if let Err(e) = self.send(&sender, &ack) {
            debug!(map = %self.name, peer = %sender, "Failed to acknowledge advertisement: {:?}", e);
        }

        self.notify_listeners(events);
    }

    fn purge_tombstones(&self) -> usize {
        let peers = self.cluster.peers();
        let safe_time = peers
            .iter()
            .map(|peer| self.anti_entropy_times.get(peer).map_or(0, |t| *t))
            .min()
            .unwrap_or(u64::MAX);
        if safe_time == 0 {
            return 0;
        }

        let mut purged = 0;
        self.items.retain(|_, value| {
            let expired = value.is_tombstone() && value.creation_time() < safe_time;
            if expired {
                purged += 1;
            }
            !expired
        });
        if purged > 0 {
            debug!(map = %self.name, purged, "Purged tombstones");
        }
        purged
    }
}
