//! Style value resolution for one feature at one grid zoom.

use crate::geo::Feature;
use crate::style::color::parse_color;
use crate::style::size::{parse_size, Size, Unit};
use crate::style::types::{PrimitiveKind, StyleDeclaration, StyleProperty};
use serde_json::Value;

/// Size properties that keep fractional pixel values. Every other size is
/// rounded to a whole pixel.
pub const FLOAT_PROPERTIES: &[&str] = &[
    "opacity",
    "intensity",
    "weight",
    "scale",
    "from",
    "to",
    "rotation",
];

pub fn is_float_property(name: &str) -> bool {
    FLOAT_PROPERTIES.contains(&name)
}

/// Resolves attributes of one declaration for one feature and zoom.
///
/// Every accessor returns `None` for absent or unparsable values; the
/// caller treats that as a skip condition.
#[derive(Clone, Copy)]
pub struct StyleValueResolver<'a> {
    decl: &'a StyleDeclaration,
    feature: &'a Feature,
    zoom: u8,
}

impl<'a> StyleValueResolver<'a> {
    pub fn new(decl: &'a StyleDeclaration, feature: &'a Feature, zoom: u8) -> Self {
        Self {
            decl,
            feature,
            zoom,
        }
    }

    /// Evaluate `name` of `decl` for `feature` at `zoom`.
    pub fn resolve(
        name: &str,
        decl: &StyleDeclaration,
        feature: &Feature,
        zoom: u8,
    ) -> Option<Value> {
        let value = match decl.property(name)? {
            StyleProperty::Constant(v) => v.clone(),
            StyleProperty::Function(f) => f(feature, zoom, decl)?,
            StyleProperty::Zoom(map) => map.value_at(zoom)?.clone(),
        };
        (!value.is_null()).then_some(value)
    }

    pub fn declaration(&self) -> &'a StyleDeclaration {
        self.decl
    }

    pub fn feature(&self) -> &'a Feature {
        self.feature
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        Self::resolve(name, self.decl, self.feature, self.zoom)
    }

    /// Primitive kind. A Polygon with an `extrude` height draws as Extrude.
    pub fn kind(&self) -> Option<PrimitiveKind> {
        let kind = PrimitiveKind::parse(&self.string("type")?)?;
        if kind == PrimitiveKind::Polygon && self.get("extrude").is_some() {
            return Some(PrimitiveKind::Extrude);
        }
        Some(kind)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        let value = match self.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn number_or(&self, name: &str, default: f64) -> f64 {
        self.number(name).unwrap_or(default)
    }

    /// Unit-tagged size. Pixel sizes round to whole pixels unless `name`
    /// is a float property.
    pub fn size(&self, name: &str) -> Option<Size> {
        let mut size = parse_size(&self.get(name)?)?;
        if size.unit == Unit::Pixel && !is_float_property(name) {
            size.value = size.value.round();
        }
        Some(size)
    }

    /// Size converted to pixels with the tile's ground resolution. The
    /// converted value rounds to a whole pixel unless `name` is a float
    /// property.
    pub fn pixels(&self, name: &str, pixels_per_meter: f64) -> Option<f32> {
        let px = self.size(name)?.to_pixels(pixels_per_meter);
        Some(if is_float_property(name) { px } else { px.round() })
    }

    pub fn color(&self, name: &str) -> Option<[f32; 4]> {
        parse_color(&self.get(name)?)
    }

    pub fn string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(b) => Some(b),
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            Value::String(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn boolean_or(&self, name: &str, default: bool) -> bool {
        self.boolean(name).unwrap_or(default)
    }

    /// List of sizes, e.g. a dash pattern `[4, 2]` or `"4 2"`.
    pub fn sizes(&self, name: &str) -> Option<Vec<f32>> {
        let values: Vec<f32> = match self.get(name)? {
            Value::Array(items) => items
                .iter()
                .map(|v| parse_size(v).map(|s| s.value))
                .collect::<Option<_>>()?,
            Value::String(s) => s
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|p| !p.is_empty())
                .map(|p| p.parse::<f32>().ok())
                .collect::<Option<_>>()?,
            _ => return None,
        };
        let valid = !values.is_empty() && values.iter().all(|v| v.is_finite() && *v >= 0.0);
        (valid && values.iter().any(|v| *v > 0.0)).then_some(values)
    }
}
