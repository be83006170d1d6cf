//! The seam between the cache and a bridge's network API.
//!
//! The HTTP client for a real bridge lives outside this crate; it only has to
//! implement [`DeviceTransport`]. [`MemoryTransport`] is a complete in-process
//! implementation used by the tests and the demo.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;

use crate::config::{BridgeConfig, Credential};
use crate::errors::Error;
use crate::lock;
use crate::resource::{Resource, ResourceKind};
use crate::runtime::{self, BoxFuture};
use crate::state::DeviceState;

type Result<T> = std::result::Result<T, Error>;

/// Network access to one bridge.
///
/// Implementations do not retry and do not apply timeouts; the cache and the
/// bridge wrap every call in [`runtime::timeout`].
pub trait DeviceTransport: Send + Sync {
    /// Fetch every record of a kind, validated through [`Resource::from_value`].
    fn fetch_all(&self, kind: ResourceKind) -> BoxFuture<'_, Result<Vec<Resource>>>;

    /// Write a resolved state to one record.
    ///
    /// Writing to a [`ResourceKind::Scene`] recalls the scene; the state then
    /// only carries optional brightness and transition overrides and may be
    /// empty.
    fn write<'a>(
        &'a self,
        kind: ResourceKind,
        id: &'a str,
        state: &'a DeviceState,
    ) -> BoxFuture<'a, Result<()>>;

    /// Check the credential against the bridge.
    fn authenticate<'a>(&'a self, credential: &'a Credential) -> BoxFuture<'a, Result<()>>;
}

/// Builds a transport for a configured bridge.
///
/// Any `Fn(&BridgeConfig) -> Result<Arc<dyn DeviceTransport>>` is a connector.
pub trait Connector: Send + Sync {
    fn connect(&self, bridge: &BridgeConfig) -> Result<Arc<dyn DeviceTransport>>;
}

impl<F> Connector for F
where
    F: Fn(&BridgeConfig) -> Result<Arc<dyn DeviceTransport>> + Send + Sync,
{
    fn connect(&self, bridge: &BridgeConfig) -> Result<Arc<dyn DeviceTransport>> {
        self(bridge)
    }
}

/// A bridge simulated in memory.
///
/// Writes are merged into the stored records, so a later fetch sees them.
/// Latency and failures can be injected per kind or per record.
///
/// ```
/// use hue_lights_rs::{MemoryTransport, Resource, ResourceKind};
/// use hue_lights_rs::resource::Light;
///
/// let transport = MemoryTransport::new().with_resources([Resource::Light(Light {
///     id: "l1".into(),
///     name: "Desk".into(),
///     state: Default::default(),
///     room: None,
/// })]);
/// assert_eq!(transport.len(ResourceKind::Light), 1);
/// ```
#[derive(Default)]
pub struct MemoryTransport {
    name: String,
    records: Mutex<HashMap<ResourceKind, Vec<Resource>>>,
    credential: Option<Credential>,
    latency: Duration,
    write_delays: Mutex<HashMap<String, Duration>>,
    failing_kinds: Mutex<HashSet<ResourceKind>>,
    failing_writes: Mutex<HashSet<String>>,
    offline: AtomicBool,
    fetches: Mutex<HashMap<ResourceKind, usize>>,
    write_count: AtomicUsize,
    written: Mutex<Vec<(ResourceKind, String, DeviceState)>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name used in error messages.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_resources(self, resources: impl IntoIterator<Item = Resource>) -> Self {
        {
            let mut records = lock(&self.records);
            for resource in resources {
                records.entry(resource.kind()).or_default().push(resource);
            }
        }
        self
    }

    /// Reject any credential other than this one.
    pub fn with_credential(mut self, credential: &str) -> Self {
        self.credential = Some(Credential::new(credential));
        self
    }

    /// Delay applied to every fetch and write.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Extra delay for writes to one record.
    pub fn with_write_delay(self, id: &str, delay: Duration) -> Self {
        lock(&self.write_delays).insert(id.to_string(), delay);
        self
    }

    /// Make fetches of `kind` fail until [`MemoryTransport::heal_kind`].
    pub fn fail_kind(&self, kind: ResourceKind) {
        lock(&self.failing_kinds).insert(kind);
    }

    pub fn heal_kind(&self, kind: ResourceKind) {
        lock(&self.failing_kinds).remove(&kind);
    }

    /// Make writes to one record fail.
    pub fn fail_writes_to(&self, id: &str) {
        lock(&self.failing_writes).insert(id.to_string());
    }

    /// Simulate the bridge dropping off the network.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Replace a stored record, as if changed from another client.
    pub fn upsert(&self, resource: Resource) {
        let mut records = lock(&self.records);
        let list = records.entry(resource.kind()).or_default();
        match list.iter_mut().find(|r| r.id() == resource.id()) {
            Some(existing) => *existing = resource,
            None => list.push(resource),
        }
    }

    pub fn len(&self, kind: ResourceKind) -> usize {
        lock(&self.records).get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.records).values().all(Vec::is_empty)
    }

    /// Number of `fetch_all` calls that reached the simulated bridge for `kind`.
    pub fn fetch_count(&self, kind: ResourceKind) -> usize {
        lock(&self.fetches).get(&kind).copied().unwrap_or(0)
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Every successful write, in completion order.
    pub fn writes(&self) -> Vec<(ResourceKind, String, DeviceState)> {
        lock(&self.written).clone()
    }

    fn target(&self) -> &str {
        if self.name.is_empty() {
            "bridge"
        } else {
            &self.name
        }
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::unreachable(self.target(), "connection refused"));
        }
        Ok(())
    }
}

impl DeviceTransport for MemoryTransport {
    fn fetch_all(&self, kind: ResourceKind) -> BoxFuture<'_, Result<Vec<Resource>>> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                runtime::sleep(self.latency).await;
            }
            self.check_online()?;
            *lock(&self.fetches).entry(kind).or_default() += 1;
            if lock(&self.failing_kinds).contains(&kind) {
                return Err(Error::unreachable(
                    self.target(),
                    format!("{kind} endpoint unavailable"),
                ));
            }
            let records = lock(&self.records).get(&kind).cloned().unwrap_or_default();
            debug!("{}: served {} {kind} records", self.target(), records.len());
            Ok(records)
        })
    }

    fn write<'a>(
        &'a self,
        kind: ResourceKind,
        id: &'a str,
        state: &'a DeviceState,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let delay = lock(&self.write_delays).get(id).copied().unwrap_or_default() + self.latency;
            if !delay.is_zero() {
                runtime::sleep(delay).await;
            }
            self.check_online()?;
            if lock(&self.failing_writes).contains(id) {
                return Err(Error::device_failed(id, "write rejected"));
            }

            {
                let mut records = lock(&self.records);
                let record = records
                    .get_mut(&kind)
                    .and_then(|list| list.iter_mut().find(|r| r.id() == id))
                    .ok_or_else(|| Error::not_found(kind, id))?;
                if let Some(patched) = record.patched(state) {
                    *record = patched;
                }
            }

            self.write_count.fetch_add(1, Ordering::SeqCst);
            lock(&self.written).push((kind, id.to_string(), state.clone()));
            Ok(())
        })
    }

    fn authenticate<'a>(&'a self, credential: &'a Credential) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.check_online()?;
            match &self.credential {
                Some(expected) if expected != credential => {
                    Err(Error::authentication(self.target(), "unauthorized user"))
                }
                _ => Ok(()),
            }
        })
    }
}
