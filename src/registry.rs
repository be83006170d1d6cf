//! Every configured bridge behind one handle.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures::future::join_all;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::bridge::{Bridge, BridgeStatus, ReadPolicy};
use crate::cache::CacheStats;
use crate::config::{BridgeConfig, CacheConfig, Config, SyncConfig};
use crate::errors::Error;
use crate::parser;
use crate::resource::{GroupedLight, Light, Resource, ResourceKind, Room, Scene};
use crate::runtime;
use crate::state::DeviceState;
use crate::transport::Connector;
use crate::variation::{DeviceResult, VariationReport};

type Result<T> = std::result::Result<T, Error>;

/// A record annotated with the bridge it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tagged<T> {
    pub bridge_id: String,
    #[serde(flatten)]
    pub item: T,
}

/// A bridge that could not answer an aggregated read.
#[derive(Debug)]
pub struct BridgeFailure {
    pub bridge_id: String,
    pub error: Error,
}

/// Results gathered from every connected bridge, plus the bridges that
/// failed. A failing bridge never hides the others' results.
#[derive(Debug)]
pub struct Aggregate<T> {
    pub items: Vec<Tagged<T>>,
    pub failures: Vec<BridgeFailure>,
}

impl<T> Default for Aggregate<T> {
    fn default() -> Self {
        Aggregate {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> Aggregate<T> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Every light, grouped light, room and scene across all bridges.
#[derive(Debug, Default)]
pub struct Inventory {
    pub lights: Aggregate<Light>,
    pub grouped_lights: Aggregate<GroupedLight>,
    pub rooms: Aggregate<Room>,
    pub scenes: Aggregate<Scene>,
}

/// Outcome of warming one bridge's cache.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct WarmOutcome {
    pub bridge_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub stats: CacheStats,
}

/// The set of connected bridges.
///
/// Built once from a [`Config`] with [`BridgeRegistry::initialize`]; bridges
/// can be added and removed afterwards. The registry is cheap to share
/// behind an `Arc`.
pub struct BridgeRegistry {
    bridges: RwLock<Vec<Arc<Bridge>>>,
    connector: Arc<dyn Connector>,
    cache_config: CacheConfig,
    sync_config: SyncConfig,
}

impl BridgeRegistry {
    /// Connect every enabled bridge in `config`.
    ///
    /// Bridges connect concurrently. A bridge that fails is logged and left
    /// out; the call only fails when no bridge could be connected.
    pub async fn initialize(config: Config, connector: impl Connector + 'static) -> Result<Self> {
        config.validate()?;
        let enabled: Vec<&BridgeConfig> = config.enabled_bridges().collect();
        if enabled.is_empty() {
            return Err(Error::Configuration("no enabled bridges configured".into()));
        }

        let connector: Arc<dyn Connector> = Arc::new(connector);
        let results = join_all(enabled.iter().map(|bridge| {
            Bridge::connect(bridge, &config.cache, &config.sync, connector.as_ref())
        }))
        .await;

        let mut bridges = Vec::new();
        let mut failures = Vec::new();
        for (bridge_config, result) in enabled.iter().zip(results) {
            match result {
                Ok(bridge) => bridges.push(Arc::new(bridge)),
                Err(e) => {
                    error!("failed to connect bridge {}: {e}", bridge_config.id);
                    failures.push(format!("{}: {e}", bridge_config.id));
                }
            }
        }

        if bridges.is_empty() {
            return Err(Error::Configuration(format!(
                "no bridge could be connected ({})",
                failures.join("; ")
            )));
        }
        info!(
            "bridge registry ready: {} of {} bridges connected",
            bridges.len(),
            enabled.len()
        );

        Ok(BridgeRegistry {
            bridges: RwLock::new(bridges),
            connector,
            cache_config: config.cache.clone(),
            sync_config: config.sync.clone(),
        })
    }

    /// Connect and register one more bridge.
    pub async fn add_bridge(&self, config: &BridgeConfig) -> Result<Arc<Bridge>> {
        if self.find(&config.id).is_some() {
            return Err(Error::DuplicateBridge(config.id.clone()));
        }
        let bridge = Arc::new(
            Bridge::connect(
                config,
                &self.cache_config,
                &self.sync_config,
                self.connector.as_ref(),
            )
            .await?,
        );

        // Another add may have finished while this one was connecting.
        let duplicate = {
            let mut bridges = self.bridges.write().unwrap_or_else(PoisonError::into_inner);
            let duplicate = bridges.iter().any(|b| b.id() == config.id);
            if !duplicate {
                bridges.push(Arc::clone(&bridge));
            }
            duplicate
        };
        if duplicate {
            bridge.shutdown().await?;
            return Err(Error::DuplicateBridge(config.id.clone()));
        }
        info!("added bridge {}", config.id);
        Ok(bridge)
    }

    /// Unregister a bridge and shut it down.
    pub async fn remove_bridge(&self, id: &str) -> Result<()> {
        let removed = {
            let mut bridges = self.bridges.write().unwrap_or_else(PoisonError::into_inner);
            let pos = bridges
                .iter()
                .position(|b| b.id() == id)
                .ok_or_else(|| Error::not_found("bridge", id))?;
            bridges.remove(pos)
        };
        removed.shutdown().await
    }

    /// The bridge with the given id.
    pub fn get(&self, id: &str) -> Result<Arc<Bridge>> {
        self.find(id).ok_or_else(|| Error::not_found("bridge", id))
    }

    /// The first connected bridge, in configuration order.
    pub fn get_default(&self) -> Result<Arc<Bridge>> {
        self.list_all()
            .into_iter()
            .find(|b| b.is_connected())
            .ok_or(Error::NoBridgeAvailable)
    }

    /// The named bridge, or the default one.
    pub fn resolve(&self, id: Option<&str>) -> Result<Arc<Bridge>> {
        match id {
            Some(id) => self.get(id),
            None => self.get_default(),
        }
    }

    /// Every registered bridge, connected or not.
    pub fn list_all(&self) -> Vec<Arc<Bridge>> {
        self.bridges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn statuses(&self) -> Vec<BridgeStatus> {
        self.list_all().iter().map(|b| b.status()).collect()
    }

    pub async fn lights(&self) -> Aggregate<Light> {
        self.aggregate(ResourceKind::Light, |r| r.as_light().cloned())
            .await
    }

    pub async fn grouped_lights(&self) -> Aggregate<GroupedLight> {
        self.aggregate(ResourceKind::GroupedLight, |r| r.as_grouped_light().cloned())
            .await
    }

    pub async fn rooms(&self) -> Aggregate<Room> {
        self.aggregate(ResourceKind::Room, |r| r.as_room().cloned())
            .await
    }

    pub async fn scenes(&self) -> Aggregate<Scene> {
        self.aggregate(ResourceKind::Scene, |r| r.as_scene().cloned())
            .await
    }

    /// All four aggregations at once.
    pub async fn inventory(&self) -> Inventory {
        let (lights, grouped_lights, rooms, scenes) = futures::join!(
            self.lights(),
            self.grouped_lights(),
            self.rooms(),
            self.scenes()
        );
        Inventory {
            lights,
            grouped_lights,
            rooms,
            scenes,
        }
    }

    /// Refetch every collection of every bridge now, connected or not.
    pub async fn warm(&self) -> Vec<WarmOutcome> {
        let bridges = self.list_all();
        let results = join_all(bridges.iter().map(|b| b.refresh())).await;
        bridges
            .iter()
            .zip(results)
            .map(|(bridge, result)| WarmOutcome {
                bridge_id: bridge.id().to_string(),
                success: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
                stats: bridge.cache_stats(),
            })
            .collect()
    }

    /// Write a state to one light or grouped light.
    pub async fn apply_state(
        &self,
        bridge_id: Option<&str>,
        kind: ResourceKind,
        id: &str,
        state: &DeviceState,
    ) -> Result<DeviceState> {
        self.resolve(bridge_id)?.apply_state(kind, id, state).await
    }

    /// Write a different state to each of several lights in one call.
    ///
    /// Writes run concurrently, each bounded by `timeout`. The report has one
    /// entry per target in request order; a failed or slow light is recorded
    /// in its own entry and never affects the others. If the bridge cannot
    /// be resolved, every entry carries that error.
    pub async fn apply_states(
        &self,
        bridge_id: Option<&str>,
        targets: &[(&str, DeviceState)],
        timeout: Duration,
    ) -> VariationReport {
        let bridge = match self.resolve(bridge_id) {
            Ok(bridge) => bridge,
            Err(e) => {
                warn!("states not applied to {} lights: {e}", targets.len());
                let reason = e.to_string();
                return targets
                    .iter()
                    .map(|(id, state)| DeviceResult::failed(id, state.clone(), &reason))
                    .collect();
            }
        };

        let bridge = &bridge;
        let writes = targets.iter().map(|(id, state)| async move {
            let write = bridge.apply_state(ResourceKind::Light, id, state);
            let result = match runtime::timeout(timeout, write).await {
                Ok(result) => result.map(|_| ()),
                Err(_) => Err(Error::device_failed(
                    id,
                    format!("no answer within {timeout:?}"),
                )),
            };

            match result {
                Ok(()) => {
                    debug!("{}: applied state to light {id}", bridge.id());
                    DeviceResult::succeeded(id, state.clone())
                }
                Err(e) => {
                    warn!("{}: state for light {id} failed: {e}", bridge.id());
                    DeviceResult::failed(id, state.clone(), &e)
                }
            }
        });

        join_all(writes).await.into_iter().collect()
    }

    /// Parse a phrase such as `"dim warm white slowly"` and write it.
    ///
    /// Returns the parsed state.
    pub async fn apply_text(
        &self,
        bridge_id: Option<&str>,
        kind: ResourceKind,
        id: &str,
        text: &str,
    ) -> Result<DeviceState> {
        let state = parser::parse(text);
        if state.is_empty() {
            return Err(Error::EmptyState);
        }
        self.apply_state(bridge_id, kind, id, &state).await?;
        Ok(state)
    }

    /// Recall a scene with optional brightness and transition overrides.
    pub async fn activate_scene(
        &self,
        bridge_id: Option<&str>,
        scene_id: &str,
        brightness: Option<f64>,
        transition_ms: Option<u64>,
    ) -> Result<()> {
        self.resolve(bridge_id)?
            .activate_scene(scene_id, brightness, transition_ms)
            .await
    }

    /// The lights of a room, in the room's order.
    ///
    /// Ids the room lists that are not (or no longer) cached are skipped.
    pub async fn room_lights(
        &self,
        bridge_id: Option<&str>,
        room_id: &str,
        policy: ReadPolicy,
    ) -> Result<Vec<Light>> {
        let bridge = self.resolve(bridge_id)?;
        let room = bridge.get(ResourceKind::Room, room_id, policy).await?;
        let Some(room) = room.value.as_room() else {
            return Err(Error::not_found(ResourceKind::Room, room_id));
        };

        let lights = bridge.list(ResourceKind::Light, policy).await?;
        let found = room
            .lights
            .iter()
            .filter_map(|id| {
                let light = lights.iter().find(|e| e.value.id() == id);
                if light.is_none() {
                    debug!("{}: room {room_id} lists unknown light {id}", bridge.id());
                }
                light.and_then(|e| e.value.as_light().cloned())
            })
            .collect();
        Ok(found)
    }

    /// Stop every bridge's sync and close every cache.
    ///
    /// All bridges are shut down even if some fail; the registry is empty
    /// afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        let bridges: Vec<Arc<Bridge>> = self
            .bridges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        let total = bridges.len();
        let results = join_all(bridges.iter().map(|b| b.shutdown())).await;
        let failures: Vec<String> = bridges
            .iter()
            .zip(results)
            .filter_map(|(bridge, result)| {
                result.err().map(|e| {
                    error!("failed to shut down bridge {}: {e}", bridge.id());
                    format!("{}: {e}", bridge.id())
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::partial("shutdown", failures, total))
        }
    }

    async fn aggregate<T>(
        &self,
        kind: ResourceKind,
        extract: fn(&Resource) -> Option<T>,
    ) -> Aggregate<T> {
        let mut out = Aggregate::default();
        let (bridges, skipped): (Vec<Arc<Bridge>>, Vec<Arc<Bridge>>) =
            self.list_all().into_iter().partition(|b| b.is_connected());
        for bridge in skipped {
            debug!("skipping disconnected bridge {} for {kind} list", bridge.id());
            out.failures.push(BridgeFailure {
                bridge_id: bridge.id().to_string(),
                error: Error::unreachable(bridge.id(), "disconnected"),
            });
        }

        let results = join_all(
            bridges
                .iter()
                .map(|b| b.list(kind, ReadPolicy::AcceptStale)),
        )
        .await;

        for (bridge, result) in bridges.iter().zip(results) {
            match result {
                Ok(entries) => out.items.extend(entries.iter().filter_map(|e| {
                    extract(&e.value).map(|item| Tagged {
                        bridge_id: bridge.id().to_string(),
                        item,
                    })
                })),
                Err(error) => {
                    warn!("{}: failed to list {kind}: {error}", bridge.id());
                    out.failures.push(BridgeFailure {
                        bridge_id: bridge.id().to_string(),
                        error,
                    });
                }
            }
        }
        out
    }

    fn find(&self, id: &str) -> Option<Arc<Bridge>> {
        self.bridges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|b| b.id() == id)
            .cloned()
    }
}
