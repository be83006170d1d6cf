//! # hue_lights_rs
//!
//! An async Rust library for controlling Hue-style smart lights across one or
//! more bridges, with a cache that stays consistent under concurrent use.
//!
//! This crate provides a **runtime-agnostic** async API on top of a pluggable
//! bridge transport. It keeps a per-bridge cache of lights, grouped lights,
//! rooms and scenes, turns free-text phrases such as `"dim warm white
//! slowly"` into light states, and can spread natural-looking variation
//! across a group of lights.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use hue_lights_rs::{
//!     BridgeConfig, BridgeRegistry, Config, DeviceTransport, Error, MemoryTransport, Resource,
//!     ResourceKind,
//! };
//! use hue_lights_rs::resource::Light;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Error> {
//! let transport: Arc<dyn DeviceTransport> = Arc::new(MemoryTransport::new().with_resources([
//!     Resource::Light(Light { id: "l1".into(), name: "Desk".into(), state: Default::default(), room: None }),
//! ]));
//!
//! let mut config = Config::default();
//! config.add_bridge(BridgeConfig::new("home", "Home", "192.168.1.20", "app-key"))?;
//!
//! // Any closure from a bridge config to a transport is a connector.
//! let connector = move |_: &BridgeConfig| -> Result<Arc<dyn DeviceTransport>, Error> {
//!     Ok(transport.clone())
//! };
//! let registry = BridgeRegistry::initialize(config, connector).await?;
//!
//! let state = registry.apply_text(None, ResourceKind::Light, "l1", "bright sunset slowly").await?;
//! assert_eq!(state.get_brightness(), Some(100.0));
//! assert_eq!(state.get_transition_ms(), Some(3000));
//!
//! registry.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Runtime Agnostic**: Works with tokio, async-std, or smol async runtimes
//! - **Multiple Bridges**: Connect and aggregate any number of bridges with [`BridgeRegistry`]
//! - **Consistent Cache**: Per-kind snapshots, lazy refresh of stale data and
//!   optimistic updates in [`DeviceCache`]
//! - **Background Sync**: Periodic refresh and snapshot saving per bridge
//! - **Free Text**: Turn phrases into a [`DeviceState`] with [`parser::parse`]
//! - **Color Math**: HSV, RGB, CIE xy and mired conversions in [`color`]
//! - **Variation**: Natural per-light variation with [`VariationEngine`]
//! - **Persistence**: Cache snapshots in memory or JSON files ([`CacheBackend`])
//!
//! ## Transport
//!
//! The HTTP client for a real bridge is not part of this crate. Implement
//! [`DeviceTransport`] for it and hand the registry a [`Connector`] that
//! builds one per configured bridge. [`MemoryTransport`] simulates a bridge in
//! process.
//!
//! ## Runtime Selection
//!
//! This library is runtime-agnostic. Select your preferred runtime using feature flags:
//!
//! ### Using tokio (default)
//!
//! ```toml
//! [dependencies]
//! hue-lights-rs = "0.1"
//! tokio = { version = "1", features = ["rt-multi-thread", "macros"] }
//! ```
//!
//! ### Using async-std
//!
//! ```toml
//! [dependencies]
//! hue-lights-rs = { version = "0.1", default-features = false, features = ["runtime-async-std"] }
//! async-std = { version = "1.12", features = ["attributes"] }
//! ```
//!
//! ### Using smol
//!
//! ```toml
//! [dependencies]
//! hue-lights-rs = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! smol = "2"
//! ```
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod backend;
mod bridge;
mod cache;
pub mod color;
mod config;
mod errors;
pub mod parser;
mod registry;
pub mod resource;
pub mod runtime;
mod state;
mod sync;
mod transport;
mod types;
mod variation;

// Re-export public API
pub use backend::{CacheBackend, CacheSnapshot, JsonFileBackend, MemoryBackend};
pub use bridge::{Bridge, BridgeStatus, ReadPolicy};
pub use cache::{CacheEntry, CacheOptions, CacheStats, CollectionStats, DeviceCache};
pub use color::MatchPolicy;
pub use config::{BackendKind, BridgeConfig, CacheConfig, Config, Credential, SyncConfig};
pub use errors::Error;
pub use registry::{Aggregate, BridgeFailure, BridgeRegistry, Inventory, Tagged, WarmOutcome};
pub use resource::{Resource, ResourceKind};
pub use state::DeviceState;
pub use sync::{BridgeHealth, SyncTask};
pub use transport::{Connector, DeviceTransport, MemoryTransport};
pub use types::{Hsv, Mireds, Rgb, Xy};
pub use variation::{DeviceResult, VariationEngine, VariationPlan, VariationReport};

/// Lock a std mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
