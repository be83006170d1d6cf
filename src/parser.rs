//! Free-text lighting commands to [`DeviceState`].
//!
//! The parser is a token scanner over lower-cased input. Cue words set
//! individual attributes; whatever is left once the cues and a few filler
//! words are removed is looked up as a color name and as a white temperature
//! name.
//!
//! ```
//! use hue_lights_rs::parser::parse;
//!
//! let state = parse("Turn on the lights, 40% sunset, slowly");
//! assert_eq!(state.get_on(), Some(true));
//! assert_eq!(state.get_brightness(), Some(40.0));
//! assert_eq!(state.get_hue(), Some(20.0));
//! assert_eq!(state.get_transition_ms(), Some(3000));
//! ```

use crate::color::{self, MatchPolicy};
use crate::state::DeviceState;

const DIM_BRIGHTNESS: f64 = 30.0;
const BRIGHT_BRIGHTNESS: f64 = 100.0;

const SLOW_MS: u64 = 3000;
const QUICK_MS: u64 = 200;

const FILLER: &[&str] = &["a", "an", "and", "it", "make", "please", "set", "the", "to", "turn"];

/// Parse a free-text command with the default color match policy.
///
/// Never fails: unrecognized text yields an empty state.
///
/// ```
/// use hue_lights_rs::parser::parse;
///
/// assert!(parse("sing me a song").is_empty());
/// ```
pub fn parse(text: &str) -> DeviceState {
    parse_with(text, MatchPolicy::default())
}

/// Parse a free-text command, picking named colors with `policy`.
pub fn parse_with(text: &str, policy: MatchPolicy) -> DeviceState {
    let lower = text.to_lowercase();
    let tokens = tokenize(&lower);

    if tokens.contains(&"off") {
        return DeviceState::power(false);
    }

    let mut state = DeviceState::new();
    let mut rest = Vec::with_capacity(tokens.len());
    let mut brightness = None;
    let mut qualitative = None;

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        let next = tokens.get(i + 1).copied();

        match token {
            "on" => {
                state.on(true);
            }
            "dim" | "dimmer" => qualitative = Some(DIM_BRIGHTNESS),
            "bright" | "brighter" => qualitative = Some(BRIGHT_BRIGHTNESS),
            "slowly" | "slow" | "gradually" => {
                state.transition_ms(SLOW_MS);
            }
            "quickly" | "quick" | "fast" => {
                state.transition_ms(QUICK_MS);
            }
            "instantly" | "immediately" => {
                state.transition_ms(0);
            }
            "brightness" => {
                if let Some(value) = next.and_then(|n| n.trim_end_matches('%').parse::<f64>().ok())
                {
                    brightness = Some(value);
                    i += 1;
                }
            }
            _ => {
                if let Some(value) = percentage(token, next) {
                    brightness = Some(value);
                    if !token.ends_with('%') {
                        i += 1;
                    }
                } else if !FILLER.contains(&token) {
                    rest.push(token);
                }
            }
        }
        i += 1;
    }

    let explicit_brightness = brightness.or(qualitative);
    if let Some(value) = explicit_brightness {
        state.brightness(value);
    }

    let query = rest.join(" ");

    if let Some(hsv) = color::parse_named_color_with(&query, policy) {
        state.hsv(&hsv);
        if hsv.value() < 100.0 && explicit_brightness.is_none() {
            state.brightness(hsv.value());
        }
    }

    if let Some(mireds) = color::parse_named_color_temp_with(&query, policy) {
        state.color_temp(mireds);
    }

    state
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '%' || c == '.'))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty())
        .collect()
}

// "50%", or "50" followed by "%" / "percent".
fn percentage(token: &str, next: Option<&str>) -> Option<f64> {
    if let Some(number) = token.strip_suffix('%') {
        return number.parse().ok();
    }
    match next {
        Some("%" | "percent") => token.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mireds;

    #[test]
    fn test_off_is_terminal() {
        assert_eq!(parse("turn off"), DeviceState::power(false));
        let state = parse("turn off and make it red");
        assert_eq!(state, DeviceState::power(false));
    }

    #[test]
    fn test_percentage_with_warm_white() {
        let state = parse("50% warm white");
        assert_eq!(state.get_brightness(), Some(50.0));
        assert_eq!(state.get_color_temp(), Some(Mireds::new(370)));
        assert!(state.get_hue().is_none());
        assert!(state.get_on().is_none());
    }

    #[test]
    fn test_numeric_beats_qualitative() {
        assert_eq!(parse("dim it to 70 percent").get_brightness(), Some(70.0));
        assert_eq!(parse("bright, 20 %").get_brightness(), Some(20.0));
        assert_eq!(parse("dim").get_brightness(), Some(30.0));
        assert_eq!(parse("bright").get_brightness(), Some(100.0));
        assert_eq!(parse("brightness 65").get_brightness(), Some(65.0));
    }

    #[test]
    fn test_percentage_is_clamped() {
        assert_eq!(parse("250%").get_brightness(), Some(100.0));
    }

    #[test]
    fn test_named_color_sets_brightness_from_value() {
        let state = parse("STORMY DUSK");
        assert_eq!(state.get_hue(), Some(255.0));
        assert_eq!(state.get_saturation(), Some(45.0));
        assert_eq!(state.get_brightness(), Some(35.0));
    }

    #[test]
    fn test_explicit_brightness_overrides_color_value() {
        let state = parse("stormy dusk at 80%");
        assert_eq!(state.get_brightness(), Some(80.0));
        assert_eq!(state.get_hue(), Some(255.0));

        let state = parse("bright dusk");
        assert_eq!(state.get_brightness(), Some(100.0));
    }

    #[test]
    fn test_full_value_color_leaves_brightness() {
        let state = parse("make it red");
        assert_eq!(state.get_hue(), Some(0.0));
        assert!(state.get_brightness().is_none());
    }

    #[test]
    fn test_on_alone_does_not_pick_a_color() {
        let state = parse("on");
        assert_eq!(state, DeviceState::power(true));
    }

    #[test]
    fn test_transition_cues() {
        assert_eq!(parse("blue slowly").get_transition_ms(), Some(3000));
        assert_eq!(parse("quickly go green").get_transition_ms(), Some(200));
        assert_eq!(parse("red instantly").get_transition_ms(), Some(0));
    }

    #[test]
    fn test_color_and_temperature_are_independent() {
        let state = parse("candlelight amber");
        assert_eq!(state.get_color_temp(), Some(Mireds::new(500)));
        assert_eq!(state.get_hue(), Some(45.0));
    }

    #[test]
    fn test_words_containing_cues_are_not_cues() {
        let state = parse("office lights on");
        assert_eq!(state.get_on(), Some(true));
    }
}
