//! Bridge and cache configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, DurationSeconds, serde_as};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Top-level configuration, usually loaded from `config.json`.
///
/// ```
/// use hue_lights_rs::Config;
///
/// let config = Config::from_json(r#"{
///     "bridges": [
///         {"id": "main", "name": "Downstairs", "ip": "192.168.1.20", "app_key": "s3cret", "enabled": true}
///     ],
///     "cache": {"type": "memory", "warm_on_startup": false}
/// }"#).unwrap();
///
/// assert_eq!(config.bridges[0].address, "192.168.1.20");
/// assert_eq!(config.cache.stale_after.as_secs(), 300);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bridges: Vec<BridgeConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// One bridge entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "ip")]
    pub address: String,
    #[serde(alias = "app_key", default)]
    pub credential: Credential,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl BridgeConfig {
    pub fn new(id: &str, name: &str, address: &str, credential: &str) -> Self {
        BridgeConfig {
            id: id.to_string(),
            name: name.to_string(),
            address: address.to_string(),
            credential: Credential::new(credential),
            enabled: true,
        }
    }
}

/// An opaque application key issued by a bridge after pairing.
///
/// Never printed: `Debug` is redacted.
///
/// ```
/// use hue_lights_rs::Credential;
///
/// let key = Credential::new("abc123");
/// assert_eq!(format!("{key:?}"), "Credential(***)");
/// assert_eq!(key.expose(), "abc123");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: &str) -> Self {
        Credential(key.to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Where cache snapshots are kept between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Memory,
    File,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(rename = "type", default)]
    pub backend: BackendKind,
    /// Directory for file snapshots; one file per bridge. Defaults to the
    /// system temp directory.
    #[serde(alias = "file_path", default)]
    pub directory: Option<PathBuf>,
    /// How often the background sync writes a snapshot to the backend.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_auto_save_interval")]
    pub auto_save_interval: Duration,
    /// Fetch every collection while the bridge is being initialized.
    #[serde(default = "default_true")]
    pub warm_on_startup: bool,
    /// Age after which a collection is refetched before it is read.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_stale_after")]
    pub stale_after: Duration,
    /// Upper bound for a single bridge request.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            backend: BackendKind::default(),
            directory: None,
            auto_save_interval: default_auto_save_interval(),
            warm_on_startup: true,
            stale_after: default_stale_after(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl CacheConfig {
    /// Snapshot file for the given bridge.
    pub fn snapshot_path(&self, bridge_id: &str) -> PathBuf {
        let dir = self.directory.clone().unwrap_or_else(std::env::temp_dir);
        dir.join(format!("hue-cache-{bridge_id}.json"))
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time between background refreshes of every collection.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_sync_interval")]
    pub interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            enabled: true,
            interval: default_sync_interval(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json).map_err(Error::JsonLoad)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| Error::io("read config", e))?;
        Self::from_json(&json)
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io("create config dir", e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(Error::JsonDump)?;
        std::fs::write(path, json).map_err(|e| Error::io("write config", e))
    }

    /// The conventional config location: `$XDG_CONFIG_HOME/hue-lights/config.json`,
    /// falling back to `~/.config` and then the temp directory.
    pub fn default_path() -> PathBuf {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
            .unwrap_or_else(std::env::temp_dir);
        base.join("hue-lights").join("config.json")
    }

    /// Check bridge ids are present and unique, and enabled bridges have an address.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for bridge in &self.bridges {
            if bridge.id.trim().is_empty() {
                return Err(Error::Configuration("bridge with empty id".into()));
            }
            if !seen.insert(bridge.id.as_str()) {
                return Err(Error::DuplicateBridge(bridge.id.clone()));
            }
            if bridge.enabled && bridge.address.trim().is_empty() {
                return Err(Error::Configuration(format!(
                    "bridge {} has no address",
                    bridge.id
                )));
            }
        }
        Ok(())
    }

    pub fn enabled_bridges(&self) -> impl Iterator<Item = &BridgeConfig> {
        self.bridges.iter().filter(|b| b.enabled)
    }

    pub fn get_bridge(&self, id: &str) -> Option<&BridgeConfig> {
        self.bridges.iter().find(|b| b.id == id)
    }

    pub fn add_bridge(&mut self, bridge: BridgeConfig) -> Result<()> {
        if self.get_bridge(&bridge.id).is_some() {
            return Err(Error::DuplicateBridge(bridge.id));
        }
        self.bridges.push(bridge);
        Ok(())
    }

    pub fn remove_bridge(&mut self, id: &str) -> Result<BridgeConfig> {
        let pos = self
            .bridges
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| Error::not_found("bridge", id))?;
        Ok(self.bridges.remove(pos))
    }
}

fn default_true() -> bool {
    true
}

fn default_stale_after() -> Duration {
    Duration::from_secs(300)
}

fn default_auto_save_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_sync_interval() -> Duration {
    Duration::from_secs(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_json(r#"{"bridges": []}"#).unwrap();
        assert_eq!(config.cache.backend, BackendKind::Memory);
        assert!(config.cache.warm_on_startup);
        assert_eq!(config.cache.request_timeout, Duration::from_secs(5));
        assert_eq!(config.sync.interval, Duration::from_secs(60));
        assert!(config.sync.enabled);
    }

    #[test]
    fn test_durations_and_backend() {
        let config = Config::from_json(
            r#"{
                "cache": {
                    "type": "file",
                    "file_path": "/var/cache/hue",
                    "stale_after": 30,
                    "request_timeout": 750
                },
                "sync": {"interval": 15, "enabled": false}
            }"#,
        )
        .unwrap();
        assert_eq!(config.cache.backend, BackendKind::File);
        assert_eq!(config.cache.stale_after, Duration::from_secs(30));
        assert_eq!(config.cache.request_timeout, Duration::from_millis(750));
        assert_eq!(
            config.cache.snapshot_path("b1"),
            PathBuf::from("/var/cache/hue/hue-cache-b1.json")
        );
        assert!(!config.sync.enabled);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = Config::from_json(
            r#"{"bridges": [
                {"id": "a", "address": "10.0.0.1"},
                {"id": "a", "address": "10.0.0.2"}
            ]}"#,
        )
        .unwrap_err();
        assert_eq!(err, Error::DuplicateBridge("a".into()));
    }

    #[test]
    fn test_disabled_bridge_may_lack_address() {
        let config = Config::from_json(
            r#"{"bridges": [{"id": "spare", "address": "", "enabled": false}]}"#,
        )
        .unwrap();
        assert_eq!(config.enabled_bridges().count(), 0);
    }

    #[test]
    fn test_add_remove_bridge() {
        let mut config = Config::default();
        config
            .add_bridge(BridgeConfig::new("a", "Attic", "10.0.0.1", "k"))
            .unwrap();
        assert_eq!(
            config.add_bridge(BridgeConfig::new("a", "Again", "10.0.0.2", "k")),
            Err(Error::DuplicateBridge("a".into()))
        );
        assert_eq!(config.remove_bridge("a").unwrap().name, "Attic");
        assert!(config.remove_bridge("a").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("hue-lights-config-{}", std::process::id()));
        let path = dir.join("config.json");
        let mut config = Config::default();
        config
            .add_bridge(BridgeConfig::new("a", "Attic", "10.0.0.1", "k"))
            .unwrap();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.bridges, config.bridges);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
