//! CIE 1931 chromaticity coordinates.

use serde::{Deserialize, Serialize};

/// A point on the CIE 1931 chromaticity diagram, both axes in `[0, 1]`.
///
/// This is the color representation bridges accept on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Xy {
    x: f64,
    y: f64,
}

impl Xy {
    /// Create a new point, clamping both axes into `[0, 1]`.
    ///
    /// ```
    /// use hue_lights_rs::Xy;
    ///
    /// let xy = Xy::new(1.5, -0.2);
    /// assert_eq!((xy.x(), xy.y()), (1.0, 0.0));
    /// ```
    pub fn new(x: f64, y: f64) -> Self {
        Xy {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
