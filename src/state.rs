//! Partial light state used for writes and cached records.

use serde::{Deserialize, Serialize};

use crate::color;
use crate::types::{Hsv, Mireds, Xy};

/// A partial light state.
///
/// Every attribute is optional; `None` means "leave unchanged". The same type
/// describes what a device currently reports (inside cached records) and what
/// a caller wants to change.
///
/// Setters clamp their input into range:
///
/// ```
/// use hue_lights_rs::DeviceState;
///
/// let mut state = DeviceState::new();
/// state.brightness(140.0).hue(-30.0).saturation(55.5);
/// assert_eq!(state.get_brightness(), Some(100.0));
/// assert_eq!(state.get_hue(), Some(0.0));
/// assert_eq!(state.get_saturation(), Some(55.5));
/// ```
///
/// # Creating States
///
/// 1. **From a single attribute** using the [`From`] trait:
///    ```
///    use hue_lights_rs::{DeviceState, Mireds};
///    let state = DeviceState::from(Mireds::new(370));
///    assert!(!state.is_empty());
///    ```
///
/// 2. **Builder pattern** for combining multiple attributes:
///    ```
///    use hue_lights_rs::DeviceState;
///    let mut state = DeviceState::new();
///    state.on(true).brightness(80.0).transition_ms(400);
///    ```
#[serde_with::skip_serializing_none]
#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub(crate) on: Option<bool>,
    pub(crate) brightness: Option<f64>,
    pub(crate) hue: Option<f64>,
    pub(crate) saturation: Option<f64>,
    pub(crate) color_temp: Option<Mireds>,
    pub(crate) xy: Option<Xy>,
    pub(crate) transition_ms: Option<u64>,
}

impl DeviceState {
    /// Create a new empty state.
    ///
    /// At least one attribute must be set before it can be written.
    ///
    /// ```
    /// use hue_lights_rs::DeviceState;
    ///
    /// assert!(DeviceState::new().is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// A state that only switches power.
    pub fn power(on: bool) -> Self {
        DeviceState {
            on: Some(on),
            ..Default::default()
        }
    }

    /// Whether this state carries nothing a device could apply.
    ///
    /// A transition on its own is not an attribute; it only qualifies others.
    ///
    /// ```
    /// use hue_lights_rs::DeviceState;
    ///
    /// let mut state = DeviceState::new();
    /// state.transition_ms(300);
    /// assert!(state.is_empty());
    ///
    /// state.on(true);
    /// assert!(!state.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.on.is_none()
            && self.brightness.is_none()
            && self.hue.is_none()
            && self.saturation.is_none()
            && self.color_temp.is_none()
            && self.xy.is_none()
    }

    pub fn on(&mut self, on: bool) -> &mut Self {
        self.on = Some(on);
        self
    }

    /// Set brightness in percent, clamped to `[0, 100]`.
    pub fn brightness(&mut self, brightness: f64) -> &mut Self {
        self.brightness = Some(color::clamp_percent(brightness));
        self
    }

    /// Set hue in degrees, clamped to `[0, 360)`.
    pub fn hue(&mut self, hue: f64) -> &mut Self {
        self.hue = Some(color::clamp_hue(hue));
        self
    }

    /// Set saturation in percent, clamped to `[0, 100]`.
    pub fn saturation(&mut self, saturation: f64) -> &mut Self {
        self.saturation = Some(color::clamp_percent(saturation));
        self
    }

    /// Set hue and saturation from a color; the value component is ignored.
    pub fn hsv(&mut self, hsv: &Hsv) -> &mut Self {
        self.hue = Some(hsv.hue());
        self.saturation = Some(hsv.saturation());
        self
    }

    pub fn color_temp(&mut self, mireds: Mireds) -> &mut Self {
        self.color_temp = Some(mireds);
        self
    }

    pub fn xy(&mut self, xy: Xy) -> &mut Self {
        self.xy = Some(xy);
        self
    }

    pub fn transition_ms(&mut self, ms: u64) -> &mut Self {
        self.transition_ms = Some(ms);
        self
    }

    pub fn get_on(&self) -> Option<bool> {
        self.on
    }

    pub fn get_brightness(&self) -> Option<f64> {
        self.brightness
    }

    pub fn get_hue(&self) -> Option<f64> {
        self.hue
    }

    pub fn get_saturation(&self) -> Option<f64> {
        self.saturation
    }

    pub fn get_color_temp(&self) -> Option<Mireds> {
        self.color_temp
    }

    pub fn get_xy(&self) -> Option<Xy> {
        self.xy
    }

    pub fn get_transition_ms(&self) -> Option<u64> {
        self.transition_ms
    }

    /// Merge the attributes present in `other` into this state.
    ///
    /// Values set in `other` overwrite values in `self`. The color channels
    /// are exclusive: an incoming xy clears hue/saturation, and an incoming
    /// hue or saturation clears xy. Transitions describe a write, not a
    /// state, so they are not merged.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::{DeviceState, Xy};
    ///
    /// let mut cached = DeviceState::new();
    /// cached.on(true).hue(120.0).saturation(80.0);
    ///
    /// let mut update = DeviceState::new();
    /// update.xy(Xy::new(0.3, 0.3)).brightness(40.0);
    /// cached.merge(&update);
    ///
    /// assert_eq!(cached.get_on(), Some(true));
    /// assert_eq!(cached.get_brightness(), Some(40.0));
    /// assert!(cached.get_hue().is_none());
    /// assert!(cached.get_xy().is_some());
    /// ```
    pub fn merge(&mut self, other: &Self) {
        if let Some(on) = other.on {
            self.on = Some(on);
        }
        if let Some(brightness) = other.brightness {
            self.brightness = Some(brightness);
        }
        if other.hue.is_some() || other.saturation.is_some() {
            self.xy = None;
            if let Some(hue) = other.hue {
                self.hue = Some(hue);
            }
            if let Some(saturation) = other.saturation {
                self.saturation = Some(saturation);
            }
        }
        if let Some(xy) = other.xy {
            self.xy = Some(xy);
            self.hue = None;
            self.saturation = None;
        }
        if let Some(color_temp) = other.color_temp {
            self.color_temp = Some(color_temp);
        }
    }

    /// Produce the state that is actually sent to a bridge.
    ///
    /// Hue/saturation are converted to xy (saturation defaults to 100 when
    /// only a hue is given). An explicit xy in the same state takes
    /// precedence over the converted one. A saturation without a hue has no
    /// chromaticity and is dropped. When the result carries a color, any
    /// color temperature is dropped.
    ///
    /// ```
    /// use hue_lights_rs::{DeviceState, Mireds};
    ///
    /// let mut state = DeviceState::new();
    /// state.hue(0.0).color_temp(Mireds::new(370));
    /// let wire = state.resolve_for_write();
    ///
    /// assert!(wire.get_hue().is_none());
    /// assert!(wire.get_color_temp().is_none());
    /// assert!(wire.get_xy().unwrap().x() > 0.6);
    /// ```
    pub fn resolve_for_write(&self) -> DeviceState {
        let mut out = self.clone();

        if let (None, Some(hue)) = (out.xy, self.hue) {
            out.xy = Some(color::hsv_to_xy(hue, self.saturation.unwrap_or(100.0)));
        }
        out.hue = None;
        out.saturation = None;

        if out.xy.is_some() {
            out.color_temp = None;
        }
        out
    }

    /// Re-apply range clamping, for states that did not come through setters.
    pub(crate) fn normalized(mut self) -> Self {
        self.brightness = self.brightness.map(color::clamp_percent);
        self.hue = self.hue.map(color::clamp_hue);
        self.saturation = self.saturation.map(color::clamp_percent);
        self.color_temp = self.color_temp.map(|m| Mireds::new(m.value()));
        self.xy = self.xy.map(|xy| Xy::new(xy.x(), xy.y()));
        self
    }
}

impl From<&Hsv> for DeviceState {
    fn from(hsv: &Hsv) -> Self {
        let mut s = DeviceState::new();
        s.hsv(hsv);
        s
    }
}

impl From<Mireds> for DeviceState {
    fn from(mireds: Mireds) -> Self {
        let mut s = DeviceState::new();
        s.color_temp(mireds);
        s
    }
}

impl From<Xy> for DeviceState {
    fn from(xy: Xy) -> Self {
        let mut s = DeviceState::new();
        s.xy(xy);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_camel_case_without_nones() {
        let mut state = DeviceState::new();
        state.on(true).color_temp(Mireds::new(370)).transition_ms(3000);
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({"on": true, "colorTemp": 370, "transitionMs": 3000})
        );
    }

    #[test]
    fn test_hue_alone_resolves_at_full_saturation() {
        let mut state = DeviceState::new();
        state.hue(240.0);
        let wire = state.resolve_for_write();
        assert_eq!(wire.get_xy(), Some(color::hsv_to_xy(240.0, 100.0)));
    }

    #[test]
    fn test_explicit_xy_wins_over_hue() {
        let explicit = Xy::new(0.2, 0.4);
        let mut state = DeviceState::new();
        state.hue(10.0).saturation(50.0).xy(explicit);
        let wire = state.resolve_for_write();
        assert_eq!(wire.get_xy(), Some(explicit));
        assert!(wire.get_hue().is_none());
        assert!(wire.get_saturation().is_none());
    }

    #[test]
    fn test_saturation_alone_is_dropped() {
        let mut state = DeviceState::new();
        state.saturation(40.0).brightness(20.0);
        let wire = state.resolve_for_write();
        assert!(wire.get_xy().is_none());
        assert!(wire.get_saturation().is_none());
        assert_eq!(wire.get_brightness(), Some(20.0));
    }

    #[test]
    fn test_color_temp_kept_without_color() {
        let mut state = DeviceState::new();
        state.color_temp(Mireds::new(250)).brightness(50.0);
        let wire = state.resolve_for_write();
        assert_eq!(wire.get_color_temp(), Some(Mireds::new(250)));
    }

    #[test]
    fn test_merge_hue_clears_xy() {
        let mut cached = DeviceState::from(Xy::new(0.5, 0.4));
        let mut update = DeviceState::new();
        update.hue(200.0).transition_ms(100);
        cached.merge(&update);
        assert!(cached.get_xy().is_none());
        assert_eq!(cached.get_hue(), Some(200.0));
        assert!(cached.get_transition_ms().is_none());
    }

    #[test]
    fn test_normalized_clamps_deserialized_values() {
        let state: DeviceState = serde_json::from_value(json!({
            "brightness": 180.0,
            "colorTemp": 90,
            "xy": {"x": 1.4, "y": 0.3}
        }))
        .unwrap();
        let state = state.normalized();
        assert_eq!(state.get_brightness(), Some(100.0));
        assert_eq!(state.get_color_temp(), Some(Mireds::new(153)));
        assert_eq!(state.get_xy(), Some(Xy::new(1.0, 0.3)));
    }
}
