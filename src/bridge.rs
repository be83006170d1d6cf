//! A single connected bridge.
//!
//! A [`Bridge`] owns the transport, the cache and the background sync for one
//! configured bridge. Reads go through the cache; writes go to the transport
//! and are then patched into the cache.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use log::{info, warn};
use serde::Serialize;

use crate::backend::{CacheBackend, JsonFileBackend, MemoryBackend};
use crate::cache::{CacheEntry, CacheOptions, CacheStats, DeviceCache};
use crate::config::{BackendKind, BridgeConfig, CacheConfig, SyncConfig};
use crate::errors::Error;
use crate::resource::{Resource, ResourceKind};
use crate::runtime;
use crate::state::DeviceState;
use crate::sync::{BridgeHealth, SyncTask};
use crate::transport::{Connector, DeviceTransport};

type Result<T> = std::result::Result<T, Error>;

/// How a read handles a stale collection that could not be refreshed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Serve the last cached value and log a warning.
    #[default]
    AcceptStale,
    /// Fail with [`Error::StaleData`].
    RequireFresh,
}

/// Point-in-time view of a bridge, as reported by
/// [`BridgeRegistry::statuses`](crate::BridgeRegistry::statuses).
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct BridgeStatus {
    pub id: String,
    pub name: String,
    pub address: String,
    pub connected: bool,
    pub last_seen: Option<SystemTime>,
    pub last_error: Option<String>,
    pub sync_active: bool,
}

pub struct Bridge {
    id: String,
    name: String,
    address: String,
    transport: Arc<dyn DeviceTransport>,
    cache: Arc<DeviceCache>,
    health: Arc<BridgeHealth>,
    sync: Option<SyncTask>,
    request_timeout: Duration,
}

impl Bridge {
    /// Connect, authenticate and prepare the cache of one bridge.
    ///
    /// Warming the cache is attempted when `cache_config.warm_on_startup` is
    /// set; a failed warm is logged and leaves the bridge usable. The
    /// background sync starts last.
    pub async fn connect(
        config: &BridgeConfig,
        cache_config: &CacheConfig,
        sync_config: &SyncConfig,
        connector: &dyn Connector,
    ) -> Result<Self> {
        if config.credential.is_empty() {
            return Err(Error::authentication(&config.id, "no credential configured"));
        }

        let transport = connector.connect(config)?;
        let request_timeout = cache_config.request_timeout;
        runtime::timeout(request_timeout, transport.authenticate(&config.credential))
            .await
            .map_err(|_| Error::unreachable(&config.id, "authentication timed out"))??;

        let backend: Arc<dyn CacheBackend> = match cache_config.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::File => Arc::new(JsonFileBackend::new(
                cache_config.snapshot_path(&config.id),
            )),
        };
        let health = Arc::new(BridgeHealth::new());
        health.mark_seen();
        let cache = Arc::new(
            DeviceCache::new(
                &config.id,
                Arc::clone(&transport),
                backend,
                CacheOptions::from(cache_config),
            )
            .with_health(Arc::clone(&health)),
        );

        if cache_config.warm_on_startup {
            let result = cache.refresh_all().await;
            if let Err(e) = &result {
                warn!("{}: cache warm-up failed: {e}", config.id);
            }
            health.record_refresh(&result);
        }

        let sync = sync_config.enabled.then(|| {
            SyncTask::start(
                Arc::clone(&cache),
                Arc::clone(&health),
                sync_config.interval,
                cache_config.auto_save_interval,
            )
        });

        let name = if config.name.is_empty() {
            config.id.clone()
        } else {
            config.name.clone()
        };
        info!("connected to bridge {} ({name}) at {}", config.id, config.address);

        Ok(Bridge {
            id: config.id.clone(),
            name,
            address: config.address.clone(),
            transport,
            cache,
            health,
            sync,
            request_timeout,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.health.is_connected()
    }

    pub fn cache(&self) -> &DeviceCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn status(&self) -> BridgeStatus {
        BridgeStatus {
            id: self.id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            connected: self.health.is_connected(),
            last_seen: self.health.last_seen(),
            last_error: self.health.last_error(),
            sync_active: self.sync.as_ref().is_some_and(SyncTask::is_running),
        }
    }

    /// Read one record.
    pub async fn get(
        &self,
        kind: ResourceKind,
        id: &str,
        policy: ReadPolicy,
    ) -> Result<Arc<CacheEntry<Resource>>> {
        match self.cache.get(kind, id).await {
            Err(err @ Error::StaleData { .. }) => match (policy, self.cache.peek(kind, id)) {
                (ReadPolicy::AcceptStale, Some(entry)) => {
                    warn!("{}: serving stale {kind} {id}: {err}", self.id);
                    Ok(entry)
                }
                _ => Err(err),
            },
            result => result,
        }
    }

    /// Read every record of a kind.
    pub async fn list(
        &self,
        kind: ResourceKind,
        policy: ReadPolicy,
    ) -> Result<Vec<Arc<CacheEntry<Resource>>>> {
        match self.cache.list(kind).await {
            Err(err @ Error::StaleData { .. }) => match (policy, self.cache.peek_list(kind)) {
                (ReadPolicy::AcceptStale, Some(entries)) => {
                    warn!("{}: serving stale {kind} list: {err}", self.id);
                    Ok(entries)
                }
                _ => Err(err),
            },
            result => result,
        }
    }

    /// Write a state to a light or grouped light.
    ///
    /// The state is resolved for the wire first (see
    /// [`DeviceState::resolve_for_write`]); on success the resolved state is
    /// patched into the cache and returned.
    pub async fn apply_state(
        &self,
        kind: ResourceKind,
        id: &str,
        state: &DeviceState,
    ) -> Result<DeviceState> {
        if !kind.is_controllable() {
            return Err(Error::NotControllable(kind));
        }
        let resolved = state.resolve_for_write();
        if resolved.is_empty() {
            return Err(Error::EmptyState);
        }

        self.write(kind, id, &resolved).await?;
        self.cache.optimistic_patch(kind, id, &resolved);
        Ok(resolved)
    }

    /// Recall a scene, optionally overriding its brightness and transition.
    ///
    /// A scene changes an unknown set of lights, so the light and grouped
    /// light collections are marked stale afterwards instead of patched.
    pub async fn activate_scene(
        &self,
        scene_id: &str,
        brightness: Option<f64>,
        transition_ms: Option<u64>,
    ) -> Result<()> {
        let mut overrides = DeviceState::new();
        if let Some(brightness) = brightness {
            overrides.brightness(brightness);
        }
        if let Some(ms) = transition_ms {
            overrides.transition_ms(ms);
        }

        self.write(ResourceKind::Scene, scene_id, &overrides).await?;
        self.cache.invalidate(ResourceKind::Light);
        self.cache.invalidate(ResourceKind::GroupedLight);
        info!("{}: activated scene {scene_id}", self.id);
        Ok(())
    }

    /// Refetch every collection now.
    pub async fn refresh(&self) -> Result<()> {
        let result = self.cache.refresh_all().await;
        self.health.record_refresh(&result);
        result
    }

    /// Stop the background sync and close the cache backend.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(sync) = &self.sync {
            sync.stop(self.request_timeout + Duration::from_secs(1)).await;
        }
        self.cache.close()?;
        info!("{}: shut down", self.id);
        Ok(())
    }

    async fn write(&self, kind: ResourceKind, id: &str, state: &DeviceState) -> Result<()> {
        let timeout = self.request_timeout;
        let result = match runtime::timeout(timeout, self.transport.write(kind, id, state)).await {
            Ok(result) => result,
            Err(_) => Err(Error::device_failed(
                id,
                format!("{kind} write timed out after {timeout:?}"),
            )),
        };

        // A record that rejects or ignores a write says nothing about the
        // bridge; only an unreachable bridge clears `connected`.
        match &result {
            Ok(()) => self.health.mark_seen(),
            Err(e) => self.health.mark_failed(e),
        }
        result
    }
}
