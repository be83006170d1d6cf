//! Color space conversions and named color lookup.
//!
//! Every function here is pure and total: out-of-range inputs are clamped,
//! `NaN` is treated as zero and nothing panics.
//!
//! Named lookups run in two passes over an ordered table. The first pass looks
//! for a case-insensitive exact match. The second accepts an entry whose name
//! is contained in the query, or whose name contains the query, and by default
//! the earliest such entry in the table wins. That makes table order part of
//! the contract: more specific names (`"stormy dusk"`, `"sky blue"`) are listed
//! before the generic names they contain (`"dusk"`, `"blue"`).
//! [`MatchPolicy::LongestKey`] opts into preferring the longest matching name
//! instead.

use crate::types::{Hsv, Mireds, Rgb, Xy};

/// How the second (substring) pass of a named lookup picks between candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// The earliest matching entry in table order wins.
    #[default]
    FirstInTable,
    /// The matching entry with the longest name wins; ties go to table order.
    LongestKey,
}

/// Named colors in lookup order.
pub const NAMED_COLORS: &[(&str, Hsv)] = &[
    ("stormy dusk", hsv(255.0, 45.0, 35.0)),
    ("stormy sky", hsv(215.0, 30.0, 50.0)),
    ("stormy", hsv(220.0, 40.0, 45.0)),
    ("golden hour", hsv(38.0, 85.0, 90.0)),
    ("sunset", hsv(20.0, 90.0, 85.0)),
    ("sunrise", hsv(30.0, 70.0, 80.0)),
    ("twilight", hsv(250.0, 60.0, 35.0)),
    ("dusk", hsv(270.0, 55.0, 40.0)),
    ("fireplace", hsv(22.0, 95.0, 60.0)),
    ("ocean", hsv(195.0, 80.0, 70.0)),
    ("forest", hsv(125.0, 70.0, 45.0)),
    ("lavender", hsv(270.0, 35.0, 90.0)),
    ("sky blue", hsv(200.0, 55.0, 100.0)),
    ("light blue", hsv(205.0, 40.0, 100.0)),
    ("navy", hsv(230.0, 90.0, 45.0)),
    ("turquoise", hsv(172.0, 75.0, 90.0)),
    ("teal", hsv(175.0, 90.0, 60.0)),
    ("cyan", hsv(180.0, 100.0, 100.0)),
    ("blue", hsv(240.0, 100.0, 100.0)),
    ("lime", hsv(90.0, 100.0, 100.0)),
    ("green", hsv(120.0, 100.0, 100.0)),
    ("crimson", hsv(348.0, 90.0, 85.0)),
    ("red", hsv(0.0, 100.0, 100.0)),
    ("orange", hsv(30.0, 100.0, 100.0)),
    ("amber", hsv(45.0, 100.0, 100.0)),
    ("gold", hsv(50.0, 90.0, 100.0)),
    ("yellow", hsv(60.0, 100.0, 100.0)),
    ("pink", hsv(330.0, 50.0, 100.0)),
    ("magenta", hsv(300.0, 100.0, 100.0)),
    ("purple", hsv(280.0, 80.0, 80.0)),
    ("violet", hsv(270.0, 70.0, 90.0)),
];

/// Named white temperatures in lookup order.
pub const NAMED_COLOR_TEMPS: &[(&str, u16)] = &[
    ("candlelight", 500),
    ("candle", 500),
    ("warm white", 370),
    ("soft white", 345),
    ("relax", 447),
    ("warm", 400),
    ("neutral white", 250),
    ("neutral", 250),
    ("concentrate", 233),
    ("cool white", 200),
    ("cool", 200),
    ("energize", 156),
    ("daylight", 153),
    ("cold", 153),
];

// Wide gamut RGB D65 conversion matrix.
const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.664511, 0.154324, 0.162028],
    [0.283881, 0.668433, 0.047685],
    [0.000088, 0.072310, 0.986039],
];

const fn hsv(hue: f64, saturation: f64, value: f64) -> Hsv {
    Hsv::from_parts(hue, saturation, value)
}

/// Convert hue (degrees), saturation and value (percent) to 8-bit RGB.
///
/// ```
/// use hue_lights_rs::color::hsv_to_rgb;
///
/// assert_eq!(hsv_to_rgb(120.0, 100.0, 100.0).green(), 255);
/// assert_eq!(hsv_to_rgb(0.0, 0.0, 50.0).red(), 128);
/// ```
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> Rgb {
    let h = clamp_hue(hue) / 60.0;
    let s = clamp_percent(saturation) / 100.0;
    let v = clamp_percent(value) / 100.0;

    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match (sector as u8) % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    Rgb::new(to_channel(r), to_channel(g), to_channel(b))
}

/// Convert an sRGB color to CIE xy using the wide gamut D65 matrix.
///
/// Pure black has no chromaticity and maps to `{0, 0}`.
///
/// ```
/// use hue_lights_rs::{color::rgb_to_xy, Rgb};
///
/// let black = rgb_to_xy(Rgb::new(0, 0, 0));
/// assert_eq!((black.x(), black.y()), (0.0, 0.0));
/// ```
pub fn rgb_to_xy(rgb: Rgb) -> Xy {
    let linear = [rgb.red, rgb.green, rgb.blue].map(|c| gamma_expand(f64::from(c) / 255.0));

    let [x, y, z] = RGB_TO_XYZ.map(|row| {
        row.iter()
            .zip(linear.iter())
            .map(|(m, c)| m * c)
            .sum::<f64>()
    });

    let sum = x + y + z;
    if sum <= 0.0 {
        return Xy::default();
    }
    Xy::new(x / sum, y / sum)
}

/// Convert hue (degrees) and saturation (percent) at full value to CIE xy.
///
/// Brightness is carried separately on the wire, so value is not an input.
pub fn hsv_to_xy(hue: f64, saturation: f64) -> Xy {
    rgb_to_xy(hsv_to_rgb(hue, saturation, 100.0))
}

/// Convert Kelvin to mireds, clamped into the supported range.
///
/// Zero is treated as the warmest supported temperature.
pub fn kelvin_to_mireds(kelvin: u32) -> Mireds {
    if kelvin == 0 {
        return Mireds::new(Mireds::MAX);
    }
    let mireds = (1_000_000.0 / f64::from(kelvin)).round();
    Mireds::new(mireds.min(f64::from(u16::MAX)) as u16)
}

/// Convert mireds to Kelvin, rounded to the nearest degree.
pub fn mireds_to_kelvin(mireds: Mireds) -> u32 {
    (1_000_000.0 / f64::from(mireds.value())).round() as u32
}

/// Look up a named color with the default [`MatchPolicy::FirstInTable`].
///
/// ```
/// use hue_lights_rs::color::parse_named_color;
///
/// assert_eq!(parse_named_color("STORMY DUSK").unwrap().hue(), 255.0);
/// assert_eq!(parse_named_color("make it red").unwrap().hue(), 0.0);
/// assert!(parse_named_color("").is_none());
/// assert!(parse_named_color("plaid").is_none());
/// ```
pub fn parse_named_color(text: &str) -> Option<Hsv> {
    parse_named_color_with(text, MatchPolicy::default())
}

/// Look up a named color with an explicit match policy.
pub fn parse_named_color_with(text: &str, policy: MatchPolicy) -> Option<Hsv> {
    lookup(NAMED_COLORS, text, policy).copied()
}

/// Look up a named white temperature with the default match policy.
///
/// ```
/// use hue_lights_rs::color::parse_named_color_temp;
///
/// assert_eq!(parse_named_color_temp("Warm White").unwrap().value(), 370);
/// assert_eq!(parse_named_color_temp("bright daylight please").unwrap().value(), 153);
/// ```
pub fn parse_named_color_temp(text: &str) -> Option<Mireds> {
    parse_named_color_temp_with(text, MatchPolicy::default())
}

/// Look up a named white temperature with an explicit match policy.
pub fn parse_named_color_temp_with(text: &str, policy: MatchPolicy) -> Option<Mireds> {
    lookup(NAMED_COLOR_TEMPS, text, policy).map(|m| Mireds::new(*m))
}

fn lookup<'a, T>(table: &'a [(&str, T)], text: &str, policy: MatchPolicy) -> Option<&'a T> {
    let query = text.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    if let Some((_, value)) = table.iter().find(|(name, _)| *name == query) {
        return Some(value);
    }

    let mut candidates = table
        .iter()
        .filter(|(name, _)| query.contains(name) || name.contains(query.as_str()));

    let found = match policy {
        MatchPolicy::FirstInTable => candidates.next(),
        MatchPolicy::LongestKey => {
            let mut best: Option<&(&str, T)> = None;
            for entry in candidates {
                if best.is_none_or(|b| entry.0.len() > b.0.len()) {
                    best = Some(entry);
                }
            }
            best
        }
    };
    found.map(|(_, value)| value)
}

pub(crate) fn clamp_hue(hue: f64) -> f64 {
    if hue.is_nan() {
        return 0.0;
    }
    hue.clamp(0.0, 360.0) % 360.0
}

pub(crate) fn clamp_percent(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) }
}

fn gamma_expand(c: f64) -> f64 {
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

fn to_channel(c: f64) -> u8 {
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_sectors() {
        assert_eq!(hsv_to_rgb(0.0, 100.0, 100.0), Rgb::new(255, 0, 0));
        assert_eq!(hsv_to_rgb(60.0, 100.0, 100.0), Rgb::new(255, 255, 0));
        assert_eq!(hsv_to_rgb(120.0, 100.0, 100.0), Rgb::new(0, 255, 0));
        assert_eq!(hsv_to_rgb(180.0, 100.0, 100.0), Rgb::new(0, 255, 255));
        assert_eq!(hsv_to_rgb(240.0, 100.0, 100.0), Rgb::new(0, 0, 255));
        assert_eq!(hsv_to_rgb(300.0, 100.0, 100.0), Rgb::new(255, 0, 255));
    }

    #[test]
    fn test_out_of_range_inputs_clamp() {
        assert_eq!(hsv_to_rgb(360.0, 100.0, 100.0), Rgb::new(255, 0, 0));
        assert_eq!(hsv_to_rgb(-20.0, 150.0, 200.0), Rgb::new(255, 0, 0));
        assert_eq!(hsv_to_rgb(f64::NAN, f64::NAN, f64::NAN), Rgb::new(0, 0, 0));
        assert_eq!(hsv_to_rgb(90.0, 0.0, 100.0), Rgb::new(255, 255, 255));
    }

    #[test]
    fn test_channels_stay_in_bounds() {
        for h in (0..720).step_by(7) {
            for s in (0..=100).step_by(25) {
                let rgb = hsv_to_rgb(h as f64 - 180.0, s as f64, 100.0);
                let xy = rgb_to_xy(rgb);
                assert!((0.0..=1.0).contains(&xy.x()));
                assert!((0.0..=1.0).contains(&xy.y()));
            }
        }
    }

    #[test]
    fn test_pure_red_xy() {
        let xy = rgb_to_xy(Rgb::new(255, 0, 0));
        assert!(xy.x() > 0.6, "x = {}", xy.x());
        assert!(xy.y() > 0.2, "y = {}", xy.y());
    }

    #[test]
    fn test_black_xy() {
        assert_eq!(rgb_to_xy(Rgb::new(0, 0, 0)), Xy::new(0.0, 0.0));
    }

    #[test]
    fn test_white_is_near_d65() {
        let xy = rgb_to_xy(Rgb::new(255, 255, 255));
        assert!((xy.x() - 0.3227).abs() < 0.01, "x = {}", xy.x());
        assert!((xy.y() - 0.329).abs() < 0.01, "y = {}", xy.y());
    }

    #[test]
    fn test_hsv_to_xy_matches_rgb_path() {
        assert_eq!(hsv_to_xy(240.0, 100.0), rgb_to_xy(Rgb::new(0, 0, 255)));
    }

    #[test]
    fn test_kelvin_conversions() {
        assert_eq!(kelvin_to_mireds(6500).value(), 154);
        assert_eq!(kelvin_to_mireds(2000).value(), 500);
        assert_eq!(kelvin_to_mireds(1000).value(), 500);
        assert_eq!(kelvin_to_mireds(0).value(), 500);
        assert_eq!(mireds_to_kelvin(Mireds::new(250)), 4000);
    }

    #[test]
    fn test_named_color_case_insensitive() {
        let upper = parse_named_color("STORMY DUSK");
        let lower = parse_named_color("stormy dusk");
        assert!(upper.is_some());
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_specific_names_precede_generic() {
        assert_eq!(parse_named_color("stormy dusk vibes"), Some(hsv(255.0, 45.0, 35.0)));
        assert_eq!(parse_named_color("a dusk glow"), Some(hsv(270.0, 55.0, 40.0)));
        assert_eq!(parse_named_color("sky blue"), Some(hsv(200.0, 55.0, 100.0)));
        assert_eq!(parse_named_color("deep blue"), Some(hsv(240.0, 100.0, 100.0)));
    }

    #[test]
    fn test_query_contained_in_name() {
        // "lavend" is a prefix of "lavender"
        assert_eq!(parse_named_color("lavend"), Some(hsv(270.0, 35.0, 90.0)));
    }

    #[test]
    fn test_longest_key_policy() {
        assert_eq!(parse_named_color("red sunset"), Some(hsv(20.0, 90.0, 85.0)));
        assert_eq!(
            parse_named_color_with("crimson red", MatchPolicy::FirstInTable),
            Some(hsv(348.0, 90.0, 85.0))
        );
        assert_eq!(
            parse_named_color_with("gold and yellow", MatchPolicy::FirstInTable),
            Some(hsv(50.0, 90.0, 100.0))
        );
        assert_eq!(
            parse_named_color_with("gold and yellow", MatchPolicy::LongestKey),
            Some(hsv(60.0, 100.0, 100.0))
        );
    }

    #[test]
    fn test_empty_query() {
        assert!(parse_named_color("   ").is_none());
        assert!(parse_named_color_temp("").is_none());
    }

    #[test]
    fn test_named_temps() {
        assert_eq!(parse_named_color_temp("candlelight").map(|m| m.value()), Some(500));
        assert_eq!(parse_named_color_temp("50% warm white").map(|m| m.value()), Some(370));
        assert_eq!(parse_named_color_temp("cool white").map(|m| m.value()), Some(200));
        assert_eq!(parse_named_color_temp("purple"), None);
    }

    #[test]
    fn test_table_entries_are_in_range() {
        for (name, color) in NAMED_COLORS {
            assert_eq!(name.to_lowercase(), *name);
            assert!(Hsv::create(color.hue(), color.saturation(), color.value()).is_some());
        }
        for (name, mireds) in NAMED_COLOR_TEMPS {
            assert_eq!(name.to_lowercase(), *name);
            assert!(Mireds::create(*mireds).is_some());
        }
    }
}
