//! Hue, saturation and value color representation.

use serde::{Deserialize, Serialize};

use super::{Rgb, Xy};

/// Hue, saturation and value color representation.
///
/// - Hue: the color angle on the color wheel, `[0, 360)` degrees
/// - Saturation: the intensity of the color, `[0, 100]` percent
/// - Value: the lightness of the color, `[0, 100]` percent
///
/// Named colors resolve to this type. The value component doubles as a
/// brightness hint: "dusk" is darker than "sunrise".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Hsv {
    hue: f64,
    saturation: f64,
    value: f64,
}

impl Hsv {
    /// Create a new color, clamping every component into range.
    ///
    /// `NaN` components become zero; a hue of exactly 360 wraps to 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Hsv;
    ///
    /// let hsv = Hsv::new(400.0, -5.0, 150.0);
    /// assert_eq!(hsv.hue(), 0.0);
    /// assert_eq!(hsv.saturation(), 0.0);
    /// assert_eq!(hsv.value(), 100.0);
    /// ```
    pub fn new(hue: f64, saturation: f64, value: f64) -> Self {
        Hsv {
            hue: crate::color::clamp_hue(hue),
            saturation: crate::color::clamp_percent(saturation),
            value: crate::color::clamp_percent(value),
        }
    }

    /// Create a new color, rejecting out-of-range components.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Hsv;
    ///
    /// assert!(Hsv::create(0.0, 100.0, 100.0).is_some());
    /// assert!(Hsv::create(360.0, 50.0, 50.0).is_none());
    /// assert!(Hsv::create(180.0, 101.0, 50.0).is_none());
    /// ```
    pub fn create(hue: f64, saturation: f64, value: f64) -> Option<Self> {
        let valid = (0.0..360.0).contains(&hue)
            && (0.0..=100.0).contains(&saturation)
            && (0.0..=100.0).contains(&value);
        valid.then_some(Hsv {
            hue,
            saturation,
            value,
        })
    }

    /// Build from components already known to be in range.
    pub(crate) const fn from_parts(hue: f64, saturation: f64, value: f64) -> Self {
        Hsv {
            hue,
            saturation,
            value,
        }
    }

    /// Get the hue value.
    pub fn hue(&self) -> f64 {
        self.hue
    }

    /// Get the saturation value.
    pub fn saturation(&self) -> f64 {
        self.saturation
    }

    /// Get the value (lightness) component.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Convert to an 8-bit RGB color.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Hsv;
    ///
    /// let color = Hsv::new(0.0, 100.0, 100.0).to_rgb();
    /// assert_eq!((color.red(), color.green(), color.blue()), (255, 0, 0));
    /// ```
    pub fn to_rgb(&self) -> Rgb {
        crate::color::hsv_to_rgb(self.hue, self.saturation, self.value)
    }

    /// Convert to CIE xy chromaticity.
    pub fn to_xy(&self) -> Xy {
        self.to_rgb().to_xy()
    }
}

impl From<&Hsv> for Rgb {
    fn from(hsv: &Hsv) -> Self {
        hsv.to_rgb()
    }
}
