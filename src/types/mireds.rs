//! Color temperature control.

use serde::{Deserialize, Serialize};

/// Color temperature in mireds (micro reciprocal degrees), from 153 to 500.
///
/// Lower values produce cooler (more blue) light, while higher values produce
/// warmer (more yellow/orange) light. Typical values:
/// - 500: Candlelight (2000K)
/// - 370: Warm white (2700K)
/// - 250: Neutral white (4000K)
/// - 153: Daylight (6500K)
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Mireds(u16);

impl Mireds {
    pub const MIN: u16 = 153;
    pub const MAX: u16 = 500;

    /// Create a new temperature, clamping into the valid range.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Mireds;
    ///
    /// assert_eq!(Mireds::new(100).value(), 153);
    /// assert_eq!(Mireds::new(370).value(), 370);
    /// assert_eq!(Mireds::new(900).value(), 500);
    /// ```
    pub fn new(value: u16) -> Self {
        Mireds(value.clamp(Self::MIN, Self::MAX))
    }

    /// Create a new temperature.
    ///
    /// Returns `None` if value is outside the valid range (153-500).
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Mireds;
    ///
    /// assert!(Mireds::create(152).is_none());
    /// assert!(Mireds::create(153).is_some());
    /// assert!(Mireds::create(500).is_some());
    /// assert!(Mireds::create(501).is_none());
    /// ```
    pub fn create(value: u16) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then_some(Mireds(value))
    }

    /// Convert from Kelvin, clamping into range.
    ///
    /// ```
    /// use hue_lights_rs::Mireds;
    ///
    /// assert_eq!(Mireds::from_kelvin(2700).value(), 370);
    /// assert_eq!(Mireds::from_kelvin(10_000).value(), 153);
    /// ```
    pub fn from_kelvin(kelvin: u32) -> Self {
        crate::color::kelvin_to_mireds(kelvin)
    }

    /// Get the mired value.
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Get the approximate temperature in Kelvin.
    pub fn kelvin(&self) -> u32 {
        crate::color::mireds_to_kelvin(*self)
    }
}

impl Default for Mireds {
    fn default() -> Self {
        Mireds(Self::MAX)
    }
}

impl From<Mireds> for u16 {
    fn from(m: Mireds) -> Self {
        m.0
    }
}
