//! Feature and geometry types.

use crate::error::{CompileError, CompileResult};
use glam::DVec3;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Feature identifier as found in the source data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Int(u64),
    Str(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Int(id) => write!(f, "{id}"),
            FeatureId::Str(id) => f.write_str(id),
        }
    }
}

impl From<u64> for FeatureId {
    fn from(id: u64) -> Self {
        FeatureId::Int(id)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        FeatureId::Str(id.to_string())
    }
}

/// Single-geometry classification used by the primitive factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
}

impl GeometryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
        }
    }
}

/// Polygon with optional holes. Ring 0 is the exterior ring.
///
/// Triangle indices are cached here after the first unclipped
/// triangulation. Indices only depend on ring topology, so they stay valid
/// at every zoom level as long as the rings were not clipped.
#[derive(Debug, Clone)]
pub struct Polygon {
    rings: Vec<Vec<DVec3>>,
    triangulation: OnceCell<Vec<u32>>,
}

impl Polygon {
    pub fn new(rings: Vec<Vec<DVec3>>) -> CompileResult<Self> {
        let exterior = rings
            .first()
            .ok_or_else(|| CompileError::geometry("Polygon needs at least one ring"))?;
        if exterior.len() < 3 {
            return Err(CompileError::geometry(format!(
                "Polygon exterior must have at least 3 vertices, got {}",
                exterior.len()
            )));
        }
        for (ring_idx, ring) in rings.iter().enumerate() {
            if let Some(pt) = ring.iter().find(|p| !p.is_finite()) {
                return Err(CompileError::geometry(format!(
                    "Ring {} has non-finite coordinate ({}, {})",
                    ring_idx, pt.x, pt.y
                )));
            }
        }
        Ok(Self {
            rings,
            triangulation: OnceCell::new(),
        })
    }

    pub fn rings(&self) -> &[Vec<DVec3>] {
        &self.rings
    }

    pub fn exterior(&self) -> &[DVec3] {
        &self.rings[0]
    }

    pub fn holes(&self) -> &[Vec<DVec3>] {
        &self.rings[1..]
    }

    /// Total vertex count across all rings.
    pub fn vertex_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }

    pub fn cached_triangulation(&self) -> Option<&[u32]> {
        self.triangulation.get().map(Vec::as_slice)
    }

    /// Store indices computed on unclipped rings. First writer wins.
    pub(crate) fn cache_triangulation(&self, indices: Vec<u32>) -> &[u32] {
        self.triangulation.get_or_init(|| indices)
    }
}

/// Geometry of a feature, including Multi- variants.
#[derive(Debug, Clone)]
pub enum Geometry {
    Point(DVec3),
    MultiPoint(Vec<DVec3>),
    LineString(Vec<DVec3>),
    MultiLineString(Vec<Vec<DVec3>>),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

/// Borrowed single-geometry coordinates handed to the primitive factory.
#[derive(Debug, Clone, Copy)]
pub enum Coordinates<'a> {
    Point(DVec3),
    Line(&'a [DVec3]),
    Polygon(&'a Polygon),
}

impl<'a> Coordinates<'a> {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Coordinates::Point(_) => GeometryType::Point,
            Coordinates::Line(_) => GeometryType::LineString,
            Coordinates::Polygon(_) => GeometryType::Polygon,
        }
    }
}

impl Geometry {
    /// Number of single geometries after Multi- decomposition.
    pub fn part_count(&self) -> usize {
        match self {
            Geometry::Point(_) | Geometry::LineString(_) | Geometry::Polygon(_) => 1,
            Geometry::MultiPoint(points) => points.len(),
            Geometry::MultiLineString(lines) => lines.len(),
            Geometry::MultiPolygon(polygons) => polygons.len(),
        }
    }

    /// Single geometry `index` of a (possibly Multi-) geometry.
    pub fn part(&self, index: usize) -> Option<Coordinates<'_>> {
        match self {
            Geometry::Point(p) if index == 0 => Some(Coordinates::Point(*p)),
            Geometry::LineString(line) if index == 0 => Some(Coordinates::Line(line)),
            Geometry::Polygon(poly) if index == 0 => Some(Coordinates::Polygon(poly)),
            Geometry::MultiPoint(points) => points.get(index).map(|p| Coordinates::Point(*p)),
            Geometry::MultiLineString(lines) => {
                lines.get(index).map(|l| Coordinates::Line(l.as_slice()))
            }
            Geometry::MultiPolygon(polygons) => polygons.get(index).map(Coordinates::Polygon),
            _ => None,
        }
    }

    /// GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Parse a GeoJSON geometry object.
    pub fn from_geojson(value: &Value) -> CompileResult<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CompileError::geometry("geometry.type missing"))?;
        let coords = value
            .get("coordinates")
            .ok_or_else(|| CompileError::geometry("geometry.coordinates missing"))?;

        match kind {
            "Point" => Ok(Geometry::Point(parse_position(coords)?)),
            "MultiPoint" => Ok(Geometry::MultiPoint(parse_positions(coords)?)),
            "LineString" => Ok(Geometry::LineString(parse_positions(coords)?)),
            "MultiLineString" => Ok(Geometry::MultiLineString(
                as_array(coords)?
                    .iter()
                    .map(parse_positions)
                    .collect::<CompileResult<_>>()?,
            )),
            "Polygon" => Ok(Geometry::Polygon(parse_polygon(coords)?)),
            "MultiPolygon" => Ok(Geometry::MultiPolygon(
                as_array(coords)?
                    .iter()
                    .map(parse_polygon)
                    .collect::<CompileResult<_>>()?,
            )),
            other => Err(CompileError::geometry(format!(
                "Unsupported geometry type '{other}'"
            ))),
        }
    }
}

fn as_array(value: &Value) -> CompileResult<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| CompileError::geometry("coordinates must be an array"))
}

fn parse_position(value: &Value) -> CompileResult<DVec3> {
    let arr = as_array(value)?;
    let get = |i: usize| arr.get(i).and_then(Value::as_f64);
    match (get(0), get(1)) {
        (Some(x), Some(y)) => Ok(DVec3::new(x, y, get(2).unwrap_or(0.0))),
        _ => Err(CompileError::geometry("position needs two numbers")),
    }
}

fn parse_positions(value: &Value) -> CompileResult<Vec<DVec3>> {
    as_array(value)?.iter().map(parse_position).collect()
}

fn parse_polygon(value: &Value) -> CompileResult<Polygon> {
    let mut rings: Vec<Vec<DVec3>> = as_array(value)?
        .iter()
        .map(parse_positions)
        .collect::<CompileResult<_>>()?;
    // GeoJSON rings repeat the first position at the end.
    for ring in &mut rings {
        if ring.len() > 3 && ring.first() == ring.last() {
            ring.pop();
        }
    }
    Polygon::new(rings)
}

/// A styled map feature. Immutable during one compile pass.
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(id: impl Into<FeatureId>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Parse a GeoJSON `Feature` object.
    pub fn from_geojson(value: &Value) -> CompileResult<Self> {
        let id = match value.get("id") {
            Some(Value::Number(n)) => n
                .as_u64()
                .map(FeatureId::Int)
                .ok_or_else(|| CompileError::geometry("feature id must be a non-negative integer"))?,
            Some(Value::String(s)) => FeatureId::Str(s.clone()),
            _ => return Err(CompileError::geometry("feature id missing")),
        };
        let geometry = Geometry::from_geojson(
            value
                .get("geometry")
                .ok_or_else(|| CompileError::geometry("feature geometry missing"))?,
        )?;
        let properties = value
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Ok(Self {
            id,
            geometry,
            properties,
        })
    }
}
