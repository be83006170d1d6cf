//! Per-bridge cache of bridge records.
//!
//! Each [`ResourceKind`] has its own collection. A collection is an immutable
//! `Arc` snapshot behind a `RwLock`: readers clone the `Arc`, a refetch builds a
//! new collection and swaps it in whole, and an optimistic patch replaces a
//! single record copy-on-write. Nothing ever mutates a record a reader holds.
//!
//! Freshness is tracked per collection. A read of a collection older than
//! `stale_after` refetches it first; concurrent readers of the same stale
//! collection share a single refetch and all observe its outcome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};

use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::backend::{CacheBackend, CacheSnapshot};
use crate::config::CacheConfig;
use crate::errors::Error;
use crate::lock;
use crate::resource::{Resource, ResourceKind};
use crate::runtime::{self, Instant};
use crate::state::DeviceState;
use crate::sync::BridgeHealth;
use crate::transport::DeviceTransport;

type Result<T> = std::result::Result<T, Error>;

/// A cached record and when it was fetched from the bridge.
///
/// `fetched_at` only moves on a refetch; optimistic patches keep it.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: Instant,
}

/// Freshness and timeout settings.
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub stale_after: Duration,
    pub request_timeout: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CacheOptions {
    fn from(config: &CacheConfig) -> Self {
        CacheOptions {
            stale_after: config.stale_after,
            request_timeout: config.request_timeout,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Collection {
    entries: Vec<Arc<CacheEntry<Resource>>>,
    index: HashMap<String, usize>,
    refreshed_at: Option<Instant>,
}

impl Collection {
    fn build(resources: Vec<Resource>, refreshed_at: Option<Instant>) -> Self {
        let fetched_at = Instant::now();
        let mut collection = Collection {
            entries: Vec::with_capacity(resources.len()),
            index: HashMap::with_capacity(resources.len()),
            refreshed_at,
        };
        for value in resources {
            let entry = Arc::new(CacheEntry { value, fetched_at });
            match collection.index.get(entry.value.id()) {
                Some(&pos) => collection.entries[pos] = entry,
                None => {
                    collection
                        .index
                        .insert(entry.value.id().to_string(), collection.entries.len());
                    collection.entries.push(entry);
                }
            }
        }
        collection
    }

    fn get(&self, id: &str) -> Option<Arc<CacheEntry<Resource>>> {
        self.index.get(id).map(|&pos| Arc::clone(&self.entries[pos]))
    }

    /// Whether the collection ever held bridge data, fetched or loaded.
    fn is_populated(&self) -> bool {
        self.refreshed_at.is_some() || !self.entries.is_empty()
    }
}

struct Slot {
    current: RwLock<Arc<Collection>>,
    refresh_lock: runtime::Mutex<()>,
    // Bumped after every completed refetch, successful or not.
    attempts: AtomicU64,
    last_failure: Mutex<Option<String>>,
}

impl Slot {
    fn new() -> Self {
        Slot {
            current: RwLock::new(Arc::new(Collection::default())),
            refresh_lock: runtime::Mutex::new(()),
            attempts: AtomicU64::new(0),
            last_failure: Mutex::new(None),
        }
    }
}

#[derive(Default)]
struct Counters {
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
    lazy_refreshes: AtomicU64,
    optimistic_patches: AtomicU64,
}

/// Per-collection figures reported by [`DeviceCache::stats`].
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub kind: ResourceKind,
    pub entries: usize,
    pub stale: bool,
    pub age_secs: Option<u64>,
    pub last_error: Option<String>,
}

/// Counters and collection state for one bridge cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub bridge_id: String,
    pub collections: Vec<CollectionStats>,
    pub refreshes: u64,
    pub refresh_failures: u64,
    pub lazy_refreshes: u64,
    pub optimistic_patches: u64,
}

impl CacheStats {
    pub fn total_entries(&self) -> usize {
        self.collections.iter().map(|c| c.entries).sum()
    }
}

/// Cache of one bridge's lights, grouped lights, rooms and scenes.
pub struct DeviceCache {
    bridge_id: String,
    transport: Arc<dyn DeviceTransport>,
    backend: Arc<dyn CacheBackend>,
    options: CacheOptions,
    slots: [Slot; 4],
    counters: Counters,
    health: Option<Arc<BridgeHealth>>,
}

impl DeviceCache {
    /// Create a cache and seed it from the backend's last snapshot.
    ///
    /// Seeded collections count as stale until their first refetch. An
    /// unreadable snapshot is logged and ignored.
    pub fn new(
        bridge_id: &str,
        transport: Arc<dyn DeviceTransport>,
        backend: Arc<dyn CacheBackend>,
        options: CacheOptions,
    ) -> Self {
        let cache = DeviceCache {
            bridge_id: bridge_id.to_string(),
            transport,
            backend,
            options,
            slots: std::array::from_fn(|_| Slot::new()),
            counters: Counters::default(),
            health: None,
        };

        match cache.backend.load() {
            Ok(Some(snapshot)) => cache.seed(snapshot),
            Ok(None) => {}
            Err(e) => warn!("{bridge_id}: ignoring unreadable cache snapshot: {e}"),
        }
        cache
    }

    /// Report the outcome of every lazy refetch to `health`.
    pub fn with_health(mut self, health: Arc<BridgeHealth>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn bridge_id(&self) -> &str {
        &self.bridge_id
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// Whether the next read of `kind` will refetch it first.
    pub fn is_stale(&self, kind: ResourceKind) -> bool {
        match self.current(kind).refreshed_at {
            None => true,
            Some(at) => at.elapsed() > self.options.stale_after,
        }
    }

    /// One record, refetching its collection first if stale.
    pub async fn get(&self, kind: ResourceKind, id: &str) -> Result<Arc<CacheEntry<Resource>>> {
        self.ensure_fresh(kind).await?;
        self.current(kind)
            .get(id)
            .ok_or_else(|| Error::not_found(kind, id))
    }

    /// Every record of a kind, refetching the collection first if stale.
    pub async fn list(&self, kind: ResourceKind) -> Result<Vec<Arc<CacheEntry<Resource>>>> {
        self.ensure_fresh(kind).await?;
        Ok(self.current(kind).entries.clone())
    }

    /// The cached record without any freshness check.
    pub fn peek(&self, kind: ResourceKind, id: &str) -> Option<Arc<CacheEntry<Resource>>> {
        self.current(kind).get(id)
    }

    /// The cached collection without any freshness check.
    ///
    /// `None` when the collection never held data, so callers cannot mistake
    /// "never fetched" for "empty".
    pub fn peek_list(&self, kind: ResourceKind) -> Option<Vec<Arc<CacheEntry<Resource>>>> {
        let current = self.current(kind);
        current.is_populated().then(|| current.entries.clone())
    }

    /// Refetch one collection now. Returns the number of records.
    ///
    /// On failure the previous collection stays in place.
    pub async fn refresh(&self, kind: ResourceKind) -> Result<usize> {
        let slot = self.slot(kind);
        let _guard = slot.refresh_lock.lock().await;
        self.refetch_locked(slot, kind).await
    }

    /// Refetch every collection in parallel.
    ///
    /// Each collection that fetched successfully is swapped in; failed ones
    /// are left untouched. When every kind fails the first error is returned
    /// as is, otherwise the failures are reported as
    /// [`Error::PartialFailure`].
    pub async fn refresh_all(&self) -> Result<()> {
        let results = join_all(
            ResourceKind::iter().map(|kind| async move { (kind, self.refresh(kind).await) }),
        )
        .await;

        let total = results.len();
        let mut messages = Vec::new();
        let mut first = None;
        for (kind, result) in results {
            if let Err(err) = result {
                messages.push(format!("{kind}: {err}"));
                first.get_or_insert(err);
            }
        }

        match first {
            None => Ok(()),
            Some(err) if messages.len() == total => Err(err),
            Some(_) => Err(Error::partial("refresh", messages, total)),
        }
    }

    /// Merge `state` into a cached record after a successful write.
    ///
    /// The record is replaced, not mutated, and keeps its `fetched_at`.
    /// Returns `false` if the record is not cached or has no state.
    pub fn optimistic_patch(&self, kind: ResourceKind, id: &str, state: &DeviceState) -> bool {
        let mut current = write(&self.slot(kind).current);
        let Some(&pos) = current.index.get(id) else {
            return false;
        };
        let entry = &current.entries[pos];
        let Some(value) = entry.value.patched(state) else {
            return false;
        };
        let patched = Arc::new(CacheEntry {
            value,
            fetched_at: entry.fetched_at,
        });
        Arc::make_mut(&mut *current).entries[pos] = patched;
        self.counters.optimistic_patches.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Mark a collection stale without dropping its data.
    pub fn invalidate(&self, kind: ResourceKind) {
        let mut current = write(&self.slot(kind).current);
        if current.refreshed_at.is_some() {
            Arc::make_mut(&mut *current).refreshed_at = None;
        }
    }

    pub fn stats(&self) -> CacheStats {
        let collections = ResourceKind::iter()
            .map(|kind| {
                let current = self.current(kind);
                CollectionStats {
                    kind,
                    entries: current.entries.len(),
                    stale: self.is_stale(kind),
                    age_secs: current.refreshed_at.map(|at| at.elapsed().as_secs()),
                    last_error: lock(&self.slot(kind).last_failure).clone(),
                }
            })
            .collect();

        CacheStats {
            bridge_id: self.bridge_id.clone(),
            collections,
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.counters.refresh_failures.load(Ordering::Relaxed),
            lazy_refreshes: self.counters.lazy_refreshes.load(Ordering::Relaxed),
            optimistic_patches: self.counters.optimistic_patches.load(Ordering::Relaxed),
        }
    }

    /// Every cached record, in kind order.
    pub fn snapshot(&self) -> CacheSnapshot {
        let resources = ResourceKind::iter()
            .flat_map(|kind| {
                self.current(kind)
                    .entries
                    .iter()
                    .map(|e| e.value.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        CacheSnapshot {
            bridge_id: self.bridge_id.clone(),
            saved_at: SystemTime::now(),
            resources,
        }
    }

    /// Save a snapshot to the backend.
    pub fn persist(&self) -> Result<()> {
        self.backend.save(&self.snapshot())
    }

    /// Save a final snapshot and close the backend.
    pub fn close(&self) -> Result<()> {
        let saved = self.persist();
        let closed = self.backend.close();
        saved.and(closed)
    }

    async fn ensure_fresh(&self, kind: ResourceKind) -> Result<()> {
        if !self.is_stale(kind) {
            return Ok(());
        }

        let slot = self.slot(kind);
        let seen = slot.attempts.load(Ordering::SeqCst);
        let _guard = slot.refresh_lock.lock().await;

        if slot.attempts.load(Ordering::SeqCst) != seen {
            // Someone refetched while we waited; share the outcome.
            return match lock(&slot.last_failure).clone() {
                Some(reason) => Err(Error::stale(kind, reason)),
                None => Ok(()),
            };
        }
        if !self.is_stale(kind) {
            return Ok(());
        }

        self.counters.lazy_refreshes.fetch_add(1, Ordering::Relaxed);
        debug!("{}: {kind} collection is stale, refetching", self.bridge_id);
        let result = self.refetch_locked(slot, kind).await;
        if let Some(health) = &self.health {
            match &result {
                Ok(_) => health.mark_seen(),
                Err(e) => health.mark_failed(e),
            }
        }
        result.map(|_| ()).map_err(|e| Error::stale(kind, e))
    }

    // Caller holds `slot.refresh_lock`.
    async fn refetch_locked(&self, slot: &Slot, kind: ResourceKind) -> Result<usize> {
        let result = self.fetch(kind).await;
        slot.attempts.fetch_add(1, Ordering::SeqCst);

        match result {
            Ok(resources) => {
                let count = resources.len();
                *write(&slot.current) = Arc::new(Collection::build(resources, Some(Instant::now())));
                *lock(&slot.last_failure) = None;
                self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                debug!("{}: refreshed {count} {kind} records", self.bridge_id);
                Ok(count)
            }
            Err(e) => {
                *lock(&slot.last_failure) = Some(e.to_string());
                self.counters.refresh_failures.fetch_add(1, Ordering::Relaxed);
                warn!("{}: failed to refresh {kind}: {e}", self.bridge_id);
                Err(e)
            }
        }
    }

    async fn fetch(&self, kind: ResourceKind) -> Result<Vec<Resource>> {
        let timeout = self.options.request_timeout;
        let resources = runtime::timeout(timeout, self.transport.fetch_all(kind))
            .await
            .map_err(|_| {
                Error::unreachable(
                    &self.bridge_id,
                    format!("fetching {kind} timed out after {timeout:?}"),
                )
            })??;

        if let Some(other) = resources.iter().find(|r| r.kind() != kind) {
            return Err(Error::invalid_record(
                kind,
                format!("transport returned a {} record", other.kind()),
            ));
        }
        Ok(resources)
    }

    fn seed(&self, snapshot: CacheSnapshot) {
        let mut grouped: HashMap<ResourceKind, Vec<Resource>> = HashMap::new();
        for resource in snapshot.resources {
            grouped.entry(resource.kind()).or_default().push(resource);
        }
        for (kind, resources) in grouped {
            *write(&self.slot(kind).current) = Arc::new(Collection::build(resources, None));
        }
        info!(
            "{}: seeded cache from snapshot saved at {:?}",
            self.bridge_id, snapshot.saved_at
        );
    }

    fn current(&self, kind: ResourceKind) -> Arc<Collection> {
        Arc::clone(&read(&self.slot(kind).current))
    }

    fn slot(&self, kind: ResourceKind) -> &Slot {
        let index = match kind {
            ResourceKind::Light => 0,
            ResourceKind::GroupedLight => 1,
            ResourceKind::Room => 2,
            ResourceKind::Scene => 3,
        };
        &self.slots[index]
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::resource::{Light, Room};
    use crate::transport::MemoryTransport;

    fn light(id: &str, on: bool) -> Resource {
        Resource::Light(Light {
            id: id.into(),
            name: format!("Light {id}"),
            state: DeviceState::power(on),
            room: Some("r1".into()),
        })
    }

    fn room(name: &str) -> Resource {
        Resource::Room(Room {
            id: "r1".into(),
            name: name.into(),
            lights: vec!["l1".into(), "l2".into()],
            grouped_light: None,
        })
    }

    fn setup(transport: MemoryTransport) -> (Arc<MemoryTransport>, DeviceCache) {
        let transport = Arc::new(transport.with_resources([
            light("l1", false),
            light("l2", true),
            room("Den"),
        ]));
        let cache = DeviceCache::new(
            "b1",
            transport.clone(),
            Arc::new(MemoryBackend::new()),
            CacheOptions::default(),
        );
        (transport, cache)
    }

    fn is_on(entry: &CacheEntry<Resource>) -> Option<bool> {
        entry.value.state().and_then(DeviceState::get_on)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_reads_do_not_refetch() {
        let (transport, cache) = setup(MemoryTransport::new());
        assert!(cache.is_stale(ResourceKind::Light));

        assert_eq!(cache.list(ResourceKind::Light).await.unwrap().len(), 2);
        let entry = cache.get(ResourceKind::Light, "l2").await.unwrap();
        assert_eq!(is_on(&entry), Some(true));
        assert_eq!(transport.fetch_count(ResourceKind::Light), 1);
        assert!(!cache.is_stale(ResourceKind::Light));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_collection_is_refetched() {
        let (transport, cache) = setup(MemoryTransport::new());
        cache.list(ResourceKind::Light).await.unwrap();

        tokio::time::advance(Duration::from_secs(299)).await;
        cache.get(ResourceKind::Light, "l1").await.unwrap();
        assert_eq!(transport.fetch_count(ResourceKind::Light), 1);

        transport.upsert(light("l1", true));
        tokio::time::advance(Duration::from_secs(2)).await;
        let entry = cache.get(ResourceKind::Light, "l1").await.unwrap();
        assert_eq!(is_on(&entry), Some(true));
        assert_eq!(transport.fetch_count(ResourceKind::Light), 2);
        assert_eq!(cache.stats().lazy_refreshes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_lazy_refetch_is_stale_data() {
        let (transport, cache) = setup(MemoryTransport::new());
        cache.list(ResourceKind::Light).await.unwrap();

        transport.set_offline(true);
        tokio::time::advance(Duration::from_secs(301)).await;
        let err = cache.get(ResourceKind::Light, "l1").await.unwrap_err();
        assert!(matches!(
            err,
            Error::StaleData {
                kind: ResourceKind::Light,
                ..
            }
        ));

        // The old value is still there for callers that accept it.
        let stale = cache.peek(ResourceKind::Light, "l1").unwrap();
        assert_eq!(is_on(&stale), Some(false));
        assert_eq!(cache.peek_list(ResourceKind::Light).unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_fetched_collection_is_not_empty_data() {
        let (transport, cache) = setup(MemoryTransport::new());
        transport.set_offline(true);
        assert!(cache.list(ResourceKind::Scene).await.is_err());
        assert!(cache.peek_list(ResourceKind::Scene).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_all_keeps_failed_kinds() {
        let (transport, cache) = setup(MemoryTransport::new());
        cache.refresh_all().await.unwrap();

        transport.upsert(light("l1", true));
        transport.upsert(room("Library"));
        transport.fail_kind(ResourceKind::Room);

        let err = cache.refresh_all().await.unwrap_err();
        match err {
            Error::PartialFailure {
                failures, total, ..
            } => {
                assert_eq!(total, 4);
                assert_eq!(failures.len(), 1);
                assert!(failures[0].starts_with("room: "));
            }
            other => panic!("unexpected error: {other}"),
        }

        let l1 = cache.peek(ResourceKind::Light, "l1").unwrap();
        assert_eq!(is_on(&l1), Some(true));
        let den = cache.peek(ResourceKind::Room, "r1").unwrap();
        assert_eq!(den.value.name(), Some("Den"));
        assert!(cache.stats().collections[2].last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_all_offline_returns_cause() {
        let (transport, cache) = setup(MemoryTransport::new());
        cache.refresh_all().await.unwrap();
        transport.set_offline(true);

        let err = cache.refresh_all().await.unwrap_err();
        assert!(err.is_unreachable());
        assert_eq!(cache.peek_list(ResourceKind::Light).unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_after_failed_refresh_returns_prior_value() {
        let (transport, cache) = setup(MemoryTransport::new());
        cache.refresh_all().await.unwrap();

        tokio::time::advance(Duration::from_secs(120)).await;
        transport.upsert(light("l1", true));
        transport.set_offline(true);
        assert!(cache.refresh_all().await.is_err());

        let entry = cache.get(ResourceKind::Light, "l1").await.unwrap();
        assert_eq!(is_on(&entry), Some(false));
        assert_eq!(cache.list(ResourceKind::Room).await.unwrap().len(), 1);
        assert_eq!(transport.fetch_count(ResourceKind::Light), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_refetch_reports_to_health() {
        let (transport, cache) = setup(MemoryTransport::new());
        let health = Arc::new(BridgeHealth::new());
        let cache = cache.with_health(health.clone());

        cache.list(ResourceKind::Light).await.unwrap();
        assert!(health.is_connected());

        transport.set_offline(true);
        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(cache.get(ResourceKind::Light, "l1").await.is_err());
        assert!(!health.is_connected());
        assert!(health.last_error().unwrap().contains("unreachable"));

        transport.set_offline(false);
        cache.get(ResourceKind::Light, "l1").await.unwrap();
        assert!(health.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_optimistic_patch_without_network() {
        let (transport, cache) = setup(MemoryTransport::new());
        let before = cache.get(ResourceKind::Light, "l1").await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(cache.optimistic_patch(ResourceKind::Light, "l1", &DeviceState::power(true)));

        let after = cache.get(ResourceKind::Light, "l1").await.unwrap();
        assert_eq!(is_on(&after), Some(true));
        assert_eq!(after.fetched_at, before.fetched_at);
        assert_eq!(is_on(&before), Some(false));
        assert_eq!(transport.fetch_count(ResourceKind::Light), 1);
        assert_eq!(transport.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_patch_unknown_or_stateless_record() {
        let (_, cache) = setup(MemoryTransport::new());
        cache.refresh_all().await.unwrap();
        assert!(!cache.optimistic_patch(ResourceKind::Light, "zz", &DeviceState::power(true)));
        assert!(!cache.optimistic_patch(ResourceKind::Room, "r1", &DeviceState::power(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stale_reads_share_one_fetch() {
        let (transport, cache) =
            setup(MemoryTransport::new().with_latency(Duration::from_millis(100)));

        let (a, b) = tokio::join!(
            cache.list(ResourceKind::Light),
            cache.get(ResourceKind::Light, "l2")
        );
        assert_eq!(a.unwrap().len(), 2);
        assert!(b.is_ok());
        assert_eq!(transport.fetch_count(ResourceKind::Light), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failed_refetch_is_shared() {
        let (transport, cache) =
            setup(MemoryTransport::new().with_latency(Duration::from_millis(100)));
        transport.fail_kind(ResourceKind::Scene);

        let (a, b) = tokio::join!(
            cache.list(ResourceKind::Scene),
            cache.list(ResourceKind::Scene)
        );
        assert!(matches!(a, Err(Error::StaleData { .. })));
        assert!(matches!(b, Err(Error::StaleData { .. })));
        assert_eq!(transport.fetch_count(ResourceKind::Scene), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_is_unreachable() {
        let (_, cache) = setup(MemoryTransport::new().with_latency(Duration::from_secs(30)));
        let err = cache.refresh(ResourceKind::Light).await.unwrap_err();
        assert!(err.is_unreachable(), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_from_backend_and_saved_on_close() {
        let transport = Arc::new(MemoryTransport::new().with_resources([light("l1", true)]));
        let backend = Arc::new(MemoryBackend::with_snapshot(CacheSnapshot {
            bridge_id: "b1".into(),
            saved_at: SystemTime::UNIX_EPOCH,
            resources: vec![light("l1", false), room("Den")],
        }));
        let cache = DeviceCache::new(
            "b1",
            transport.clone(),
            backend.clone(),
            CacheOptions::default(),
        );

        let seeded = cache.peek(ResourceKind::Light, "l1").unwrap();
        assert_eq!(is_on(&seeded), Some(false));
        assert!(cache.is_stale(ResourceKind::Light));

        let fresh = cache.get(ResourceKind::Light, "l1").await.unwrap();
        assert_eq!(is_on(&fresh), Some(true));

        cache.close().unwrap();
        let saved = backend.load().unwrap().unwrap();
        assert_eq!(saved.resources.len(), 2);
        assert!(saved.resources.contains(&light("l1", true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_keeps_data() {
        let (transport, cache) = setup(MemoryTransport::new());
        cache.refresh(ResourceKind::Light).await.unwrap();
        cache.invalidate(ResourceKind::Light);
        assert!(cache.is_stale(ResourceKind::Light));
        assert!(cache.peek(ResourceKind::Light, "l1").is_some());
        cache.list(ResourceKind::Light).await.unwrap();
        assert_eq!(transport.fetch_count(ResourceKind::Light), 2);
    }
}
