//! Value types for light color parameters.

mod hsv;
mod mireds;
mod rgb;
mod xy;

pub use hsv::Hsv;
pub use mireds::Mireds;
pub use rgb::Rgb;
pub use xy::Xy;
