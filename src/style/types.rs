//! Style declaration model.
//!
//! A [`StyleDeclaration`] is one paint rule: a `type` attribute naming the
//! primitive plus any number of named appearance attributes. Each attribute
//! is a constant, a feature-dependent function or a zoom-breakpoint map.

use crate::error::{CompileError, CompileResult};
use crate::geo::Feature;
use crate::style::zoom::ZoomMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Primitive kinds a declaration can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Text,
    Icon,
    Line,
    Polygon,
    Extrude,
    Circle,
    Rect,
    Box,
    Sphere,
    Model,
    Heatmap,
    VerticalLine,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 12] = [
        PrimitiveKind::Text,
        PrimitiveKind::Icon,
        PrimitiveKind::Line,
        PrimitiveKind::Polygon,
        PrimitiveKind::Extrude,
        PrimitiveKind::Circle,
        PrimitiveKind::Rect,
        PrimitiveKind::Box,
        PrimitiveKind::Sphere,
        PrimitiveKind::Model,
        PrimitiveKind::Heatmap,
        PrimitiveKind::VerticalLine,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Text => "Text",
            PrimitiveKind::Icon => "Icon",
            PrimitiveKind::Line => "Line",
            PrimitiveKind::Polygon => "Polygon",
            PrimitiveKind::Extrude => "Extrude",
            PrimitiveKind::Circle => "Circle",
            PrimitiveKind::Rect => "Rect",
            PrimitiveKind::Box => "Box",
            PrimitiveKind::Sphere => "Sphere",
            PrimitiveKind::Model => "Model",
            PrimitiveKind::Heatmap => "Heatmap",
            PrimitiveKind::VerticalLine => "VerticalLine",
        }
    }

    /// Kinds that can take part in label collision avoidance.
    pub fn is_collidable(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::Text
                | PrimitiveKind::Icon
                | PrimitiveKind::Circle
                | PrimitiveKind::Rect
                | PrimitiveKind::Box
                | PrimitiveKind::Sphere
                | PrimitiveKind::Model
        )
    }

    /// Whether overlapping placements are allowed when `collide` is unset.
    pub fn collides_by_default(&self) -> bool {
        !matches!(self, PrimitiveKind::Text)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature-dependent attribute: `(feature, grid_zoom, declaration) -> value`.
pub type StyleFn = Arc<dyn Fn(&Feature, u8, &StyleDeclaration) -> Option<Value> + Send + Sync>;

/// One attribute value of a declaration.
#[derive(Clone)]
pub enum StyleProperty {
    Constant(Value),
    Function(StyleFn),
    Zoom(Arc<ZoomMap>),
}

impl fmt::Debug for StyleProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleProperty::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            StyleProperty::Function(_) => f.write_str("Function(..)"),
            StyleProperty::Zoom(map) => f.debug_tuple("Zoom").field(map.stops()).finish(),
        }
    }
}

impl StyleProperty {
    /// Classify a JSON attribute value. Objects whose keys are all integer
    /// zooms become zoom-breakpoint maps.
    pub fn from_json(value: Value) -> Self {
        if let Value::Object(obj) = &value {
            if let Some(stops) = zoom_stops(obj) {
                return StyleProperty::Zoom(Arc::new(ZoomMap::new(stops)));
            }
        }
        StyleProperty::Constant(value)
    }
}

fn zoom_stops(obj: &Map<String, Value>) -> Option<BTreeMap<u8, Value>> {
    if obj.is_empty() {
        return None;
    }
    obj.iter()
        .map(|(k, v)| k.trim().parse::<u8>().ok().map(|z| (z, v.clone())))
        .collect()
}

impl From<Value> for StyleProperty {
    fn from(value: Value) -> Self {
        StyleProperty::from_json(value)
    }
}

impl From<ZoomMap> for StyleProperty {
    fn from(map: ZoomMap) -> Self {
        StyleProperty::Zoom(Arc::new(map))
    }
}

impl From<&str> for StyleProperty {
    fn from(value: &str) -> Self {
        StyleProperty::Constant(Value::String(value.to_string()))
    }
}

impl From<f64> for StyleProperty {
    fn from(value: f64) -> Self {
        StyleProperty::Constant(Value::from(value))
    }
}

impl From<i64> for StyleProperty {
    fn from(value: i64) -> Self {
        StyleProperty::Constant(Value::from(value))
    }
}

impl From<bool> for StyleProperty {
    fn from(value: bool) -> Self {
        StyleProperty::Constant(Value::Bool(value))
    }
}

/// One paint rule.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(try_from = "Value")]
pub struct StyleDeclaration {
    properties: BTreeMap<String, StyleProperty>,
}

impl StyleDeclaration {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self::default().with("type", kind.as_str())
    }

    pub fn with(mut self, name: &str, value: impl Into<StyleProperty>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn with_fn<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Feature, u8, &StyleDeclaration) -> Option<Value> + Send + Sync + 'static,
    {
        self.properties
            .insert(name.to_string(), StyleProperty::Function(Arc::new(f)));
        self
    }

    pub fn property(&self, name: &str) -> Option<&StyleProperty> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn from_json_object(obj: Map<String, Value>) -> Self {
        Self {
            properties: obj
                .into_iter()
                .map(|(k, v)| (k, StyleProperty::from_json(v)))
                .collect(),
        }
    }
}

impl TryFrom<Value> for StyleDeclaration {
    type Error = CompileError;

    fn try_from(value: Value) -> CompileResult<Self> {
        match value {
            Value::Object(obj) => Ok(Self::from_json_object(obj)),
            other => Err(CompileError::style(format!(
                "style declaration must be an object, got {other}"
            ))),
        }
    }
}

/// Ordered declarations for one feature. Order is paint order.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(transparent)]
pub struct StyleGroup {
    pub declarations: Vec<StyleDeclaration>,
}

impl StyleGroup {
    pub fn new(declarations: Vec<StyleDeclaration>) -> Self {
        Self { declarations }
    }

    /// Parse a declaration array (or a single declaration object).
    pub fn from_json(value: &Value) -> CompileResult<Self> {
        match value {
            Value::Array(_) => Ok(serde_json::from_value(value.clone())?),
            Value::Object(_) => Ok(Self::new(vec![StyleDeclaration::try_from(value.clone())?])),
            other => Err(CompileError::style(format!(
                "style group must be an array or object, got {other}"
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parse_round_trip() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(PrimitiveKind::parse("Spline"), None);
        assert!(!PrimitiveKind::Text.collides_by_default());
        assert!(PrimitiveKind::Icon.collides_by_default());
    }

    #[test]
    fn test_zoom_objects_become_maps() {
        let decl = StyleDeclaration::try_from(json!({
            "type": "Line",
            "strokeWidth": { "10": "2px", "16": "8px" },
            "meta": { "kind": "road" }
        }))
        .unwrap();
        assert!(matches!(decl.property("strokeWidth"), Some(StyleProperty::Zoom(_))));
        assert!(matches!(decl.property("meta"), Some(StyleProperty::Constant(_))));
        assert!(matches!(decl.property("type"), Some(StyleProperty::Constant(_))));
    }

    #[test]
    fn test_group_from_json() {
        let group = StyleGroup::from_json(&json!([
            { "type": "Polygon", "fill": "#fff" },
            { "type": "Line", "stroke": "#000" }
        ]))
        .unwrap();
        assert_eq!(group.len(), 2);

        let single = StyleGroup::from_json(&json!({ "type": "Text" })).unwrap();
        assert_eq!(single.len(), 1);

        let err = StyleGroup::from_json(&json!([1, 2])).unwrap_err();
        assert_eq!(err.category(), "JSON");
        assert!(StyleGroup::from_json(&json!("Line")).is_err());
    }
}
