//! Persistence for cache snapshots.
//!
//! A backend only stores and returns whole snapshots; freshness is never
//! persisted, so loaded data is always treated as stale.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::lock;
use crate::resource::Resource;

type Result<T> = std::result::Result<T, Error>;

/// Every cached record of one bridge at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub bridge_id: String,
    pub saved_at: SystemTime,
    pub resources: Vec<Resource>,
}

/// Key-value style storage for one bridge's snapshot.
pub trait CacheBackend: Send + Sync {
    /// The last saved snapshot, if any.
    fn load(&self) -> Result<Option<CacheSnapshot>>;

    /// Store a snapshot. May block on file IO, so the background sync runs
    /// it through [`runtime::spawn_blocking`](crate::runtime::spawn_blocking).
    fn save(&self, snapshot: &CacheSnapshot) -> Result<()>;

    /// Release any resources; the backend is not used afterwards.
    fn close(&self) -> Result<()>;
}

/// Keeps the snapshot in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    snapshot: Mutex<Option<CacheSnapshot>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot.
    pub fn with_snapshot(snapshot: CacheSnapshot) -> Self {
        MemoryBackend {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }
}

impl CacheBackend for MemoryBackend {
    fn load(&self) -> Result<Option<CacheSnapshot>> {
        Ok(lock(&self.snapshot).clone())
    }

    fn save(&self, snapshot: &CacheSnapshot) -> Result<()> {
        *lock(&self.snapshot) = Some(snapshot.clone());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Stores the snapshot as a JSON file.
///
/// Saves go to a sibling temp file first and are renamed into place, so a
/// crash mid-save leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileBackend { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<CacheSnapshot>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io("read snapshot", e)),
        };
        let snapshot = serde_json::from_str(&json).map_err(Error::JsonLoad)?;
        debug!("loaded cache snapshot from {}", self.path.display());
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &CacheSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io("create snapshot dir", e))?;
        }
        let json = serde_json::to_vec(snapshot).map_err(Error::JsonDump)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| Error::io("write snapshot", e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| Error::io("rename snapshot", e))?;
        debug!("saved cache snapshot to {}", self.path.display());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
