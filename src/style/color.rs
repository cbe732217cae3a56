//! Color parsing for style values.

use serde_json::Value;

/// Parse a style color value: a CSS color string or an `[r, g, b, a?]`
/// array with channels in 0..1.
pub fn parse_color(value: &Value) -> Option<[f32; 4]> {
    match value {
        Value::String(s) => parse_color_string(s),
        Value::Array(channels) if channels.len() == 3 || channels.len() == 4 => {
            let mut rgba = [0.0, 0.0, 0.0, 1.0];
            for (slot, channel) in rgba.iter_mut().zip(channels) {
                *slot = channel.as_f64()? as f32;
            }
            Some(rgba)
        }
        _ => None,
    }
}

/// Encode an RGBA color as a style value array.
pub fn color_to_value(rgba: [f32; 4]) -> Value {
    Value::Array(
        rgba.iter()
            .map(|c| {
                serde_json::Number::from_f64(*c as f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            })
            .collect(),
    )
}

/// Parse a CSS color string to RGBA.
pub fn parse_color_string(s: &str) -> Option<[f32; 4]> {
    let s = s.trim();

    if s.starts_with('#') {
        return parse_hex_color(s);
    }

    if s.starts_with("rgb") {
        return parse_rgb_color(s);
    }

    if s.starts_with("hsl") {
        return parse_hsl_color(s);
    }

    // Named colors (subset)
    match s.to_lowercase().as_str() {
        "black" => Some([0.0, 0.0, 0.0, 1.0]),
        "white" => Some([1.0, 1.0, 1.0, 1.0]),
        "red" => Some([1.0, 0.0, 0.0, 1.0]),
        "green" => Some([0.0, 0.5, 0.0, 1.0]),
        "blue" => Some([0.0, 0.0, 1.0, 1.0]),
        "yellow" => Some([1.0, 1.0, 0.0, 1.0]),
        "cyan" => Some([0.0, 1.0, 1.0, 1.0]),
        "magenta" => Some([1.0, 0.0, 1.0, 1.0]),
        "gray" | "grey" => Some([0.5, 0.5, 0.5, 1.0]),
        "orange" => Some([1.0, 0.647, 0.0, 1.0]),
        "transparent" => Some([0.0, 0.0, 0.0, 0.0]),
        _ => None,
    }
}

fn hex_channel(hex: &str, range: std::ops::Range<usize>, short: bool) -> Option<f32> {
    let digits = hex.get(range)?;
    let byte = if short {
        u8::from_str_radix(&digits.repeat(2), 16).ok()?
    } else {
        u8::from_str_radix(digits, 16).ok()?
    };
    Some(byte as f32 / 255.0)
}

fn parse_hex_color(s: &str) -> Option<[f32; 4]> {
    let hex = s.trim_start_matches('#');
    match hex.len() {
        3 | 4 => {
            let r = hex_channel(hex, 0..1, true)?;
            let g = hex_channel(hex, 1..2, true)?;
            let b = hex_channel(hex, 2..3, true)?;
            let a = if hex.len() == 4 {
                hex_channel(hex, 3..4, true)?
            } else {
                1.0
            };
            Some([r, g, b, a])
        }
        6 | 8 => {
            let r = hex_channel(hex, 0..2, false)?;
            let g = hex_channel(hex, 2..4, false)?;
            let b = hex_channel(hex, 4..6, false)?;
            let a = if hex.len() == 8 {
                hex_channel(hex, 6..8, false)?
            } else {
                1.0
            };
            Some([r, g, b, a])
        }
        _ => None,
    }
}

fn parse_rgb_color(s: &str) -> Option<[f32; 4]> {
    let inner = s
        .trim_start_matches("rgba(")
        .trim_start_matches("rgb(")
        .trim_end_matches(')');
    let parts: Vec<&str> = inner.split(',').map(|p| p.trim()).collect();

    if parts.len() < 3 {
        return None;
    }

    let r: f32 = parts[0].trim_end_matches('%').parse().ok()?;
    let g: f32 = parts[1].trim_end_matches('%').parse().ok()?;
    let b: f32 = parts[2].trim_end_matches('%').parse().ok()?;

    let (r, g, b) = if parts[0].contains('%') {
        (r / 100.0, g / 100.0, b / 100.0)
    } else {
        (r / 255.0, g / 255.0, b / 255.0)
    };

    let a = if parts.len() >= 4 {
        parts[3].parse().unwrap_or(1.0)
    } else {
        1.0
    };

    Some([r, g, b, a])
}

fn parse_hsl_color(s: &str) -> Option<[f32; 4]> {
    let inner = s
        .trim_start_matches("hsla(")
        .trim_start_matches("hsl(")
        .trim_end_matches(')');
    let parts: Vec<&str> = inner.split(',').map(|p| p.trim()).collect();

    if parts.len() < 3 {
        return None;
    }

    let h: f32 = parts[0].parse().ok()?;
    let s_val: f32 = parts[1].trim_end_matches('%').parse::<f32>().ok()? / 100.0;
    let l: f32 = parts[2].trim_end_matches('%').parse::<f32>().ok()? / 100.0;

    let a = if parts.len() >= 4 {
        parts[3].parse().unwrap_or(1.0)
    } else {
        1.0
    };

    let (r, g, b) = hsl_to_rgb(h / 360.0, s_val, l);
    Some([r, g, b, a])
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        return (l, l, l);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    (
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}
