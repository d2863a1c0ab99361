//! Recovers the red/green thickness cut-points of a plot's color ramp from
//! the rendered colors alone.
//!
//! The ramp function itself is unknown, so the estimate is a straight line
//! through the thinnest and thickest samples. Interior samples never move
//! the result.

use crate::model::ColorThresholds;

pub const RED_COLOR_VALUE: f64 = 50.0;
pub const GREEN_COLOR_VALUE: f64 = 370.0;
const COLOR_VALUE_LIMIT: i32 = 512;
const MIN_SAMPLES: usize = 3;
const PRECISION: f64 = 1_000_000.0;

/// Position of a hex color along the red→green ramp, or -1 when unusable.
///
/// The green byte climbs first; once it saturates (or is unreadable) the
/// falling red byte carries the value further, giving a single monotonic
/// scale in `[0, 512)`. Channels are read leniently: `#fff` is red 0xff,
/// green 0xf.
pub fn parse_color_value(hex_color: &str) -> i32 {
    let digits: Vec<char> = hex_color.replacen('#', "", 1).chars().collect();
    let channel = |range: std::ops::Range<usize>| {
        digits
            .get(range.start.min(digits.len())..range.end.min(digits.len()))
            .and_then(parse_hex_prefix)
    };

    let value = match (channel(0..2), channel(2..4)) {
        (_, Some(green)) if green < i32::from(u8::MAX) => green,
        (Some(red), _) => COLOR_VALUE_LIMIT - red,
        (None, _) => return -1,
    };

    if (0..COLOR_VALUE_LIMIT).contains(&value) {
        value
    } else {
        -1
    }
}

/// Leading hex digits of a channel slice, with an optional sign.
fn parse_hex_prefix(chars: &[char]) -> Option<i32> {
    let text: String = chars.iter().collect();
    let text = text.trim_start();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let digits: String = unsigned
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect();
    let magnitude = i32::from_str_radix(&digits, 16).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    color: f64,
    thickness: f64,
}

/// Estimates thresholds from `(hex color, thickness)` pairs.
pub fn estimate_thresholds<'a>(
    samples: impl IntoIterator<Item = (&'a str, f64)>,
) -> Option<ColorThresholds> {
    let mut samples: Vec<Sample> = samples
        .into_iter()
        .filter_map(|(hex_color, thickness)| {
            let color = parse_color_value(hex_color);
            (color != -1).then_some(Sample {
                color: f64::from(color),
                thickness,
            })
        })
        .collect();

    if samples.len() < MIN_SAMPLES {
        return None;
    }

    samples.sort_by(|a, b| {
        a.thickness
            .total_cmp(&b.thickness)
            .then(a.color.total_cmp(&b.color))
    });

    let thinnest = samples.first()?;
    let thickest = samples.last()?;

    let slope = (thinnest.color - thickest.color) / (thinnest.thickness - thickest.thickness);
    let intercept = thinnest.color - slope * thinnest.thickness;

    let green = (GREEN_COLOR_VALUE - intercept) / slope;
    let red = green - (GREEN_COLOR_VALUE - RED_COLOR_VALUE) / slope;

    let red = round_threshold(red);
    let green = round_threshold(green);

    if !red.is_finite() || !green.is_finite() || red == 0.0 || green == 0.0 {
        return None;
    }

    Some(ColorThresholds {
        start_of_red: red,
        start_of_green: green,
    })
}

fn round_threshold(value: f64) -> f64 {
    (value * PRECISION).round() / PRECISION
}
