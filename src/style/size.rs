//! Unit-tagged size values ("12", "12px", "40m").

use crate::geo::EARTH_CIRCUMFERENCE;
use serde_json::Value;
use std::fmt;

/// Unit of a size value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Unit {
    #[default]
    Pixel,
    Meter,
}

impl Unit {
    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::Pixel => "px",
            Unit::Meter => "m",
        }
    }
}

/// A size with its unit. Pixel is the default unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub value: f32,
    pub unit: Unit,
}

impl Size {
    pub fn px(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Pixel,
        }
    }

    pub fn meters(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Meter,
        }
    }

    /// Value in meters at `zoom` (pixel values are converted at the equator).
    pub fn to_meters(&self, zoom: f64) -> f64 {
        match self.unit {
            Unit::Meter => self.value as f64,
            Unit::Pixel => self.value as f64 * meters_per_pixel_at_zoom(zoom),
        }
    }

    /// Value in pixels given the tile's ground resolution.
    pub fn to_pixels(&self, pixels_per_meter: f64) -> f32 {
        match self.unit {
            Unit::Pixel => self.value,
            Unit::Meter => (self.value as f64 * pixels_per_meter) as f32,
        }
    }

    /// Encode back into a style value: plain number for pixels, "<v>m" for meters.
    pub fn to_value(&self) -> Value {
        match self.unit {
            Unit::Pixel => serde_json::Number::from_f64(self.value as f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Unit::Meter => Value::String(format!("{}m", self.value)),
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

/// Equatorial ground resolution of a 256px tile pyramid.
pub fn meters_per_pixel_at_zoom(zoom: f64) -> f64 {
    EARTH_CIRCUMFERENCE / (256.0 * 2f64.powf(zoom))
}

/// Parse a size from a number or a numeric string with optional unit suffix.
pub fn parse_size(value: &Value) -> Option<Size> {
    match value {
        Value::Number(n) => Some(Size::px(n.as_f64()? as f32)),
        Value::String(s) => parse_size_str(s),
        _ => None,
    }
}

pub fn parse_size_str(s: &str) -> Option<Size> {
    let s = s.trim();
    let (digits, unit) = if let Some(stripped) = s.strip_suffix("px") {
        (stripped, Unit::Pixel)
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, Unit::Meter)
    } else {
        (s, Unit::Pixel)
    };
    let value: f32 = digits.trim().parse().ok()?;
    value.is_finite().then_some(Size { value, unit })
}
