//! Background synchronization of a bridge cache.
//!
//! Every connected bridge runs one [`SyncTask`]: it refreshes all of the
//! bridge's collections on a fixed interval, records the outcome in the
//! bridge's [`BridgeHealth`] and periodically saves a cache snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use futures::channel::oneshot;
use futures::future::{Either, select};
use log::{debug, error, info, warn};

use crate::cache::DeviceCache;
use crate::errors::Error;
use crate::lock;
use crate::runtime::{self, Instant, JoinHandle};

type Result<T> = std::result::Result<T, Error>;

/// Reachability of one bridge, as last observed.
#[derive(Debug)]
pub struct BridgeHealth {
    connected: AtomicBool,
    last_seen: Mutex<Option<SystemTime>>,
    last_error: Mutex<Option<String>>,
}

impl Default for BridgeHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeHealth {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            last_seen: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn last_seen(&self) -> Option<SystemTime> {
        *lock(&self.last_seen)
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    /// The bridge answered.
    pub fn mark_seen(&self) {
        self.connected.store(true, Ordering::SeqCst);
        *lock(&self.last_seen) = Some(SystemTime::now());
        *lock(&self.last_error) = None;
    }

    /// A request failed.
    ///
    /// The error is always kept as `last_error`, but only an unreachable
    /// bridge counts as disconnected. A rejected or timed out write to one
    /// record, or a missing record, is about that request.
    pub fn mark_failed(&self, err: &Error) {
        if err.is_unreachable() {
            self.connected.store(false, Ordering::SeqCst);
        }
        *lock(&self.last_error) = Some(err.to_string());
    }

    /// Record the outcome of a full refresh.
    ///
    /// A partial failure still proves the bridge is up.
    pub fn record_refresh(&self, result: &Result<()>) {
        match result {
            Ok(()) => self.mark_seen(),
            Err(err @ Error::PartialFailure { .. }) => {
                self.mark_seen();
                *lock(&self.last_error) = Some(err.to_string());
            }
            Err(err) => self.mark_failed(err),
        }
    }
}

/// Handle to a running background sync loop.
pub struct SyncTask {
    bridge_id: String,
    running: Arc<AtomicBool>,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SyncTask {
    /// Spawn the sync loop.
    ///
    /// The first refresh happens one `interval` after start; warming is the
    /// caller's business.
    pub fn start(
        cache: Arc<DeviceCache>,
        health: Arc<BridgeHealth>,
        interval: Duration,
        auto_save_interval: Duration,
    ) -> Self {
        let bridge_id = cache.bridge_id().to_string();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let running = Arc::new(AtomicBool::new(true));

        let task_running = Arc::clone(&running);
        let handle = runtime::spawn(async move {
            let id = cache.bridge_id().to_string();
            let mut last_saved = Instant::now();
            info!("{id}: background sync every {interval:?}");

            loop {
                let tick = Box::pin(runtime::sleep(interval));
                if let Either::Left(_) = select(&mut stop_rx, tick).await {
                    break;
                }

                let result = cache.refresh_all().await;
                match &result {
                    Ok(()) => debug!("{id}: sync complete"),
                    Err(e) => warn!("{id}: sync failed: {e}"),
                }
                health.record_refresh(&result);

                if last_saved.elapsed() >= auto_save_interval {
                    let saving = Arc::clone(&cache);
                    if let Err(e) = runtime::spawn_blocking(move || saving.persist()).await {
                        error!("{id}: failed to save cache snapshot: {e}");
                    }
                    last_saved = Instant::now();
                }
            }

            task_running.store(false, Ordering::SeqCst);
            debug!("{id}: background sync stopped");
        });

        SyncTask {
            bridge_id,
            running,
            stop_tx: Mutex::new(Some(stop_tx)),
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal the loop to stop and wait up to `grace` for it to finish.
    ///
    /// A loop still busy after `grace` is aborted. Returns whether it
    /// stopped on its own.
    pub async fn stop(&self, grace: Duration) -> bool {
        if let Some(tx) = lock(&self.stop_tx).take() {
            let _ = tx.send(());
        }
        let Some(mut handle) = lock(&self.handle).take() else {
            return true;
        };

        match runtime::timeout(grace, &mut handle).await {
            Ok(()) => true,
            Err(_) => {
                warn!("{}: sync did not stop within {grace:?}, aborting", self.bridge_id);
                handle.abort();
                self.running.store(false, Ordering::SeqCst);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CacheBackend, MemoryBackend};
    use crate::cache::CacheOptions;
    use crate::resource::{Light, Resource, ResourceKind};
    use crate::state::DeviceState;
    use crate::transport::MemoryTransport;

    fn setup() -> (Arc<MemoryTransport>, Arc<MemoryBackend>, Arc<DeviceCache>) {
        let transport = Arc::new(MemoryTransport::new().named("b1").with_resources([
            Resource::Light(Light {
                id: "l1".into(),
                name: "Porch".into(),
                state: DeviceState::power(true),
                room: None,
            }),
        ]));
        let backend = Arc::new(MemoryBackend::new());
        let cache = Arc::new(DeviceCache::new(
            "b1",
            transport.clone(),
            backend.clone(),
            CacheOptions::default(),
        ));
        (transport, backend, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_refreshes_on_interval() {
        let (transport, _, cache) = setup();
        let health = Arc::new(BridgeHealth::new());
        let task = SyncTask::start(
            cache.clone(),
            health.clone(),
            Duration::from_secs(60),
            Duration::from_secs(300),
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.fetch_count(ResourceKind::Light), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(transport.fetch_count(ResourceKind::Light), 1);
        assert!(health.is_connected());
        assert!(health.last_seen().is_some());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.fetch_count(ResourceKind::Light), 2);

        assert!(task.stop(Duration::from_secs(1)).await);
        assert!(!task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_marks_unreachable_bridge() {
        let (transport, _, cache) = setup();
        let health = Arc::new(BridgeHealth::new());
        health.mark_seen();
        transport.set_offline(true);

        let task = SyncTask::start(
            cache,
            health.clone(),
            Duration::from_secs(10),
            Duration::from_secs(300),
        );
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert!(!health.is_connected());
        assert!(health.last_error().unwrap().contains("unreachable"));

        transport.set_offline(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(health.is_connected());
        assert!(health.last_error().is_none());
        task.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_saves_snapshots() {
        let (_, backend, cache) = setup();
        let task = SyncTask::start(
            cache,
            Arc::new(BridgeHealth::new()),
            Duration::from_secs(60),
            Duration::from_secs(120),
        );

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(backend.load().unwrap().is_none());

        tokio::time::sleep(Duration::from_secs(60)).await;
        let saved = backend.load().unwrap().unwrap();
        assert_eq!(saved.resources.len(), 1);
        task.stop(Duration::from_secs(1)).await;
    }

    #[test]
    fn test_device_failure_keeps_bridge_connected() {
        let health = BridgeHealth::new();
        health.mark_seen();

        health.mark_failed(&Error::device_failed("l4", "write timed out after 5s"));
        assert!(health.is_connected());
        assert_eq!(
            health.last_error().as_deref(),
            Some("l4 failed: write timed out after 5s")
        );

        health.mark_failed(&Error::not_found(ResourceKind::Light, "zz"));
        assert!(health.is_connected());

        health.mark_seen();
        assert!(health.last_error().is_none());
    }

    #[test]
    fn test_partial_refresh_keeps_bridge_connected() {
        let health = BridgeHealth::new();
        health.record_refresh(&Err(Error::partial("refresh", vec!["room: x".into()], 4)));
        assert!(health.is_connected());
        assert!(health.last_error().unwrap().starts_with("refresh failed"));

        health.record_refresh(&Err(Error::unreachable("b1", "timeout")));
        assert!(!health.is_connected());
    }
}
