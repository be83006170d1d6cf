//! 8-bit sRGB color representation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::Xy;

/// An sRGB color with red, green, and blue components (0-255 each).
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub(crate) red: u8,
    pub(crate) green: u8,
    pub(crate) blue: u8,
}

impl Rgb {
    /// Create a color with the given RGB values.
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn red(&self) -> u8 {
        self.red
    }

    pub fn green(&self) -> u8 {
        self.green
    }

    pub fn blue(&self) -> u8 {
        self.blue
    }

    /// Whether every channel is zero.
    pub fn is_black(&self) -> bool {
        self.red == 0 && self.green == 0 && self.blue == 0
    }

    /// Project onto the CIE 1931 chromaticity plane.
    ///
    /// ```
    /// use hue_lights_rs::Rgb;
    ///
    /// let xy = Rgb::new(255, 0, 0).to_xy();
    /// assert!(xy.x() > 0.6 && xy.y() > 0.2);
    /// ```
    pub fn to_xy(&self) -> Xy {
        crate::color::rgb_to_xy(*self)
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parse from comma-separated string (e.g., "255,128,0").
    ///
    /// ```
    /// use std::str::FromStr;
    /// use hue_lights_rs::Rgb;
    ///
    /// assert_eq!(Rgb::from_str("255,128,0").unwrap(), Rgb::new(255, 128, 0));
    /// assert!(Rgb::from_str("255,128").is_err());
    /// assert!(Rgb::from_str("255,128,256").is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, String> {
        let parts = s
            .split(',')
            .map(|c| c.trim().parse::<u8>().map_err(|e| format!("{c:?}: {e}")))
            .collect::<Result<Vec<u8>, String>>()?;
        match parts[..] {
            [red, green, blue] => Ok(Self::new(red, green, blue)),
            _ => Err("Expected format: r,g,b".into()),
        }
    }
}

impl From<Rgb> for Xy {
    fn from(rgb: Rgb) -> Self {
        rgb.to_xy()
    }
}
