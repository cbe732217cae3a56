//! Zoom-breakpoint maps and their dense per-zoom tables.
//!
//! A map like `{10: "2px", 16: "8px"}` is expanded once into a table for the
//! integer zooms `MIN_ZOOM..=MAX_ZOOM`. Between two breakpoints numbers and
//! sizes are interpolated linearly, colors per channel. Values that cannot
//! be interpolated (strings, booleans, mismatched kinds) step at the lower
//! breakpoint.

use crate::style::color::{color_to_value, parse_color};
use crate::style::size::{meters_per_pixel_at_zoom, parse_size, Size, Unit};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::BTreeMap;

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 20;

const TABLE_LEN: usize = (MAX_ZOOM - MIN_ZOOM + 1) as usize;

/// Breakpoint map keyed by integer zoom.
#[derive(Debug, Clone)]
pub struct ZoomMap {
    stops: BTreeMap<u8, Value>,
    table: OnceCell<Vec<Option<Value>>>,
}

impl ZoomMap {
    pub fn new(stops: BTreeMap<u8, Value>) -> Self {
        Self {
            stops,
            table: OnceCell::new(),
        }
    }

    /// Build from `(zoom, value)` pairs.
    pub fn from_stops<I, V>(stops: I) -> Self
    where
        I: IntoIterator<Item = (u8, V)>,
        V: Into<Value>,
    {
        Self::new(stops.into_iter().map(|(z, v)| (z, v.into())).collect())
    }

    pub fn stops(&self) -> &BTreeMap<u8, Value> {
        &self.stops
    }

    /// Value at an integer zoom, clamped into the table range.
    pub fn value_at(&self, zoom: u8) -> Option<&Value> {
        let table = self.table.get_or_init(|| self.expand());
        let idx = zoom.clamp(MIN_ZOOM, MAX_ZOOM) - MIN_ZOOM;
        table.get(idx as usize).and_then(Option::as_ref)
    }

    fn expand(&self) -> Vec<Option<Value>> {
        let mut table = Vec::with_capacity(TABLE_LEN);
        for zoom in MIN_ZOOM..=MAX_ZOOM {
            table.push(self.interpolate(zoom));
        }
        table
    }

    fn interpolate(&self, zoom: u8) -> Option<Value> {
        let lower = self.stops.range(..=zoom).next_back();
        let upper = self.stops.range(zoom..).next();

        match (lower, upper) {
            (Some((_, v)), None) | (None, Some((_, v))) => Some(v.clone()),
            (Some((lz, lv)), Some((uz, uv))) => {
                if lz == uz {
                    return Some(lv.clone());
                }
                let t = (zoom - lz) as f64 / (uz - lz) as f64;
                Some(interpolate_values(lv, uv, t, zoom as f64))
            }
            (None, None) => None,
        }
    }
}

/// Interpolate two breakpoint values at fraction `t` for `zoom`.
pub fn interpolate_values(a: &Value, b: &Value, t: f64, zoom: f64) -> Value {
    if let (Value::Number(na), Value::Number(nb)) = (a, b) {
        if let (Some(va), Some(vb)) = (na.as_f64(), nb.as_f64()) {
            return serde_json::Number::from_f64(va + (vb - va) * t)
                .map(Value::Number)
                .unwrap_or_else(|| a.clone());
        }
    }

    if let (Some(sa), Some(sb)) = (parse_size(a), parse_size(b)) {
        return interpolate_sizes(sa, sb, t, zoom).to_value();
    }

    if let (Some(ca), Some(cb)) = (parse_color(a), parse_color(b)) {
        let mut rgba = [0.0f32; 4];
        for (i, slot) in rgba.iter_mut().enumerate() {
            *slot = ca[i] + (cb[i] - ca[i]) * t as f32;
        }
        return color_to_value(rgba);
    }

    if t < 1.0 {
        a.clone()
    } else {
        b.clone()
    }
}

/// Lerp two sizes. Mixed units are lerped in meters, then re-tagged with the
/// unit of the nearer breakpoint.
pub fn interpolate_sizes(a: Size, b: Size, t: f64, zoom: f64) -> Size {
    if a.unit == b.unit {
        let value = a.value as f64 + (b.value as f64 - a.value as f64) * t;
        return Size {
            value: value as f32,
            unit: a.unit,
        };
    }

    let ma = a.to_meters(zoom);
    let mb = b.to_meters(zoom);
    let meters = ma + (mb - ma) * t;
    let dominant = if t < 0.5 { a.unit } else { b.unit };
    match dominant {
        Unit::Meter => Size::meters(meters as f32),
        Unit::Pixel => Size::px((meters / meters_per_pixel_at_zoom(zoom)) as f32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_size_breakpoints_interpolate() {
        let map = ZoomMap::from_stops([(10, json!("2px")), (16, json!("8px"))]);
        assert_eq!(parse_size(map.value_at(13).unwrap()), Some(Size::px(5.0)));
        assert_eq!(parse_size(map.value_at(10).unwrap()), Some(Size::px(2.0)));
    }

    #[test]
    fn test_clamps_outside_breakpoints() {
        let map = ZoomMap::from_stops([(10, 2), (16, 8)]);
        assert_eq!(map.value_at(3), Some(&json!(2)));
        assert_eq!(map.value_at(19), Some(&json!(8)));
        assert_eq!(map.value_at(0), Some(&json!(2)));
        assert_eq!(map.value_at(30), Some(&json!(8)));
    }

    #[test]
    fn test_color_interpolates_per_channel() {
        let map = ZoomMap::from_stops([(10, json!("#000000")), (12, json!("#ffffff"))]);
        let mid = parse_color(map.value_at(11).unwrap()).unwrap();
        for channel in &mid[..3] {
            assert!((channel - 0.5).abs() < 1e-6);
        }
        assert_eq!(mid[3], 1.0);
    }

    #[test]
    fn test_strings_step_at_lower_breakpoint() {
        let map = ZoomMap::from_stops([(5, "Line"), (10, "Polygon")]);
        assert_eq!(map.value_at(9), Some(&json!("Line")));
        assert_eq!(map.value_at(10), Some(&json!("Polygon")));
    }

    #[test]
    fn test_mixed_units_lerp_in_meters() {
        let zoom = 12.0;
        let px_in_m = meters_per_pixel_at_zoom(zoom) as f32;
        let a = Size::px(10.0);
        let b = Size::meters(10.0 * px_in_m * 3.0);

        let near_a = interpolate_sizes(a, b, 0.25, zoom);
        assert_eq!(near_a.unit, Unit::Pixel);
        assert!((near_a.value - 15.0).abs() < 1e-3);

        let near_b = interpolate_sizes(a, b, 0.75, zoom);
        assert_eq!(near_b.unit, Unit::Meter);
        assert!((near_b.value - 25.0 * px_in_m).abs() < 1e-3);
    }

    #[test]
    fn test_empty_map_is_absent() {
        let map = ZoomMap::new(BTreeMap::new());
        assert!(map.value_at(10).is_none());
    }
}
