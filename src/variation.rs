//! Natural-looking variation across a group of lights.
//!
//! Setting every light in a room to the exact same state looks flat. The
//! [`VariationEngine`] nudges each attribute of a base state by a small random
//! amount per device and writes all devices concurrently through
//! [`BridgeRegistry::apply_states`], so one slow or failing light never holds
//! up or hides the others.

use std::fmt;
use std::ops::Deref;
use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::bridge::ReadPolicy;
use crate::errors::Error;
use crate::lock;
use crate::registry::BridgeRegistry;
use crate::state::DeviceState;
use crate::types::Mireds;

type Result<T> = std::result::Result<T, Error>;

const HUE_SPREAD: f64 = 15.0;
const HUE_MAX: f64 = 359.99;
const SATURATION_SPREAD: f64 = 10.0;
const BRIGHTNESS_SPREAD: f64 = 20.0;
const BRIGHTNESS_MIN: f64 = 5.0;
const COLOR_TEMP_SPREAD: i32 = 50;
const TRANSITION_JITTER_MS: u64 = 1000;

/// Per-device variants of one base state, in device order.
#[derive(Debug, Clone, PartialEq)]
pub struct VariationPlan {
    base: DeviceState,
    variants: Vec<DeviceState>,
}

impl VariationPlan {
    pub fn base(&self) -> &DeviceState {
        &self.base
    }

    pub fn variants(&self) -> &[DeviceState] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn into_variants(self) -> Vec<DeviceState> {
        self.variants
    }
}

/// What happened to one device.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceResult {
    pub device_id: String,
    pub applied_state: DeviceState,
    pub success: bool,
    pub error: Option<String>,
}

impl DeviceResult {
    pub(crate) fn succeeded(id: &str, applied_state: DeviceState) -> Self {
        DeviceResult {
            device_id: id.to_string(),
            applied_state,
            success: true,
            error: None,
        }
    }

    pub(crate) fn failed(id: &str, applied_state: DeviceState, error: impl fmt::Display) -> Self {
        DeviceResult {
            device_id: id.to_string(),
            applied_state,
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// One [`DeviceResult`] per requested device, in request order.
///
/// Derefs to a slice of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VariationReport(Vec<DeviceResult>);

impl VariationReport {
    pub fn all_succeeded(&self) -> bool {
        self.0.iter().all(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeviceResult> {
        self.0.iter().filter(|r| !r.success)
    }

    pub fn into_inner(self) -> Vec<DeviceResult> {
        self.0
    }

    /// The results, or [`Error::PartialFailure`] if any device failed.
    pub fn into_result(self) -> Result<Vec<DeviceResult>> {
        if self.all_succeeded() {
            return Ok(self.0);
        }
        let failures = self
            .failures()
            .map(|r| format!("{}: {}", r.device_id, r.error.as_deref().unwrap_or("failed")))
            .collect();
        Err(Error::partial("variation", failures, self.0.len()))
    }
}

impl FromIterator<DeviceResult> for VariationReport {
    fn from_iter<I: IntoIterator<Item = DeviceResult>>(iter: I) -> Self {
        VariationReport(iter.into_iter().collect())
    }
}

impl Deref for VariationReport {
    type Target = [DeviceResult];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Produces and applies per-device variations of a base state.
///
/// The random source is injectable; a seeded engine always produces the same
/// plans in the same order.
///
/// ```
/// use hue_lights_rs::{DeviceState, VariationEngine};
///
/// let mut base = DeviceState::new();
/// base.hue(200.0).brightness(60.0);
///
/// let plan = VariationEngine::with_seed(42).plan(&base, 3);
/// assert_eq!(plan.len(), 3);
/// for variant in plan.variants() {
///     let hue = variant.get_hue().unwrap();
///     assert!((185.0..=215.0).contains(&hue));
///     assert!(variant.get_saturation().is_none());
/// }
/// assert_eq!(plan, VariationEngine::with_seed(42).plan(&base, 3));
/// ```
pub struct VariationEngine {
    rng: Mutex<StdRng>,
}

impl Default for VariationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VariationEngine {
    /// An engine seeded from the operating system.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        VariationEngine {
            rng: Mutex::new(rng),
        }
    }

    /// One perturbed copy of `base`.
    ///
    /// Present attributes move within their spread and are clamped to their
    /// range; absent attributes stay absent.
    pub fn vary(&self, base: &DeviceState) -> DeviceState {
        let mut rng = lock(&self.rng);
        let mut out = base.clone();

        if let Some(hue) = base.hue {
            let delta = rng.gen_range(-HUE_SPREAD..=HUE_SPREAD);
            out.hue = Some((hue + delta).clamp(0.0, HUE_MAX));
        }
        if let Some(saturation) = base.saturation {
            let delta = rng.gen_range(-SATURATION_SPREAD..=SATURATION_SPREAD);
            out.saturation = Some((saturation + delta).clamp(0.0, 100.0));
        }
        if let Some(brightness) = base.brightness {
            let delta = rng.gen_range(-BRIGHTNESS_SPREAD..=BRIGHTNESS_SPREAD);
            out.brightness = Some((brightness + delta).clamp(BRIGHTNESS_MIN, 100.0));
        }
        if let Some(mireds) = base.color_temp {
            let delta = rng.gen_range(-COLOR_TEMP_SPREAD..=COLOR_TEMP_SPREAD);
            let value = (i32::from(mireds.value()) + delta)
                .clamp(i32::from(Mireds::MIN), i32::from(Mireds::MAX));
            out.color_temp = Some(Mireds::new(value as u16));
        }
        if let Some(ms) = base.transition_ms {
            let jitter = rng.gen_range(0..=TRANSITION_JITTER_MS);
            out.transition_ms = Some(ms.saturating_add(jitter));
        }
        out
    }

    /// Variants for `count` devices, without touching any device.
    pub fn plan(&self, base: &DeviceState, count: usize) -> VariationPlan {
        VariationPlan {
            base: base.clone(),
            variants: (0..count).map(|_| self.vary(base)).collect(),
        }
    }

    /// Write a distinct variant of `base` to every light in `device_ids`.
    ///
    /// All writes run concurrently, each bounded by `timeout`. The report
    /// always has one entry per device; a failure is recorded in its entry
    /// and never aborts the others. If the bridge cannot be resolved, every
    /// entry carries that error.
    pub async fn apply(
        &self,
        registry: &BridgeRegistry,
        bridge_id: Option<&str>,
        base: &DeviceState,
        device_ids: &[&str],
        timeout: Duration,
    ) -> VariationReport {
        let targets: Vec<(&str, DeviceState)> = device_ids
            .iter()
            .copied()
            .zip(self.plan(base, device_ids.len()).into_variants())
            .collect();
        registry.apply_states(bridge_id, &targets, timeout).await
    }

    /// [`VariationEngine::apply`] to every light of a room.
    ///
    /// Fails only if the room's lights cannot be resolved.
    pub async fn apply_to_room(
        &self,
        registry: &BridgeRegistry,
        bridge_id: Option<&str>,
        room_id: &str,
        base: &DeviceState,
        timeout: Duration,
    ) -> Result<VariationReport> {
        let lights = registry
            .room_lights(bridge_id, room_id, ReadPolicy::AcceptStale)
            .await?;
        let ids: Vec<&str> = lights.iter().map(|l| l.id.as_str()).collect();
        Ok(self.apply(registry, bridge_id, base, &ids, timeout).await)
    }
}
