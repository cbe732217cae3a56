//! Group uniforms and the batching signature derived from them.
//!
//! Declarations whose uniforms produce the same signature share one draw
//! group and thus one vertex/index buffer. Everything that changes pipeline
//! state or a uniform value is part of the signature; per-primitive data
//! (positions, sizes, glyph rotations) lives in the vertices.

use crate::core::atlas::{AtlasRegion, DashRef};
use crate::core::session::ModelRef;
use crate::style::{PrimitiveKind, Unit};
use crate::vector::line::{LineCap, LineJoin};
use std::fmt::Write;

/// Orientation of anchored primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    /// Face the camera.
    #[default]
    Viewport,
    /// Lie flat on the map plane.
    Map,
}

impl Alignment {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "viewport" => Some(Alignment::Viewport),
            "map" => Some(Alignment::Map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Viewport => "viewport",
            Alignment::Map => "map",
        }
    }
}

/// Uniform state shared by every primitive of a draw group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupUniforms {
    pub kind: PrimitiveKind,
    pub z_layer: i32,
    pub z_index: i32,
    /// Unit of sizes stored in the vertices.
    pub unit: Unit,
    pub fill: Option<[f32; 4]>,
    pub stroke: Option<[f32; 4]>,
    pub stroke_width: f32,
    /// Quantized opacity.
    pub opacity: f32,
    pub offset: [f32; 2],
    pub alignment: Alignment,
    /// Degrees.
    pub rotation: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    pub dash: Option<DashRef>,
    pub dash_image: Option<String>,
    pub dash_region: Option<AtlasRegion>,
    /// Vertices carry altitude from the source coordinates.
    pub altitude: bool,
    pub depth_test: bool,
    pub font: Option<String>,
    pub model: Option<(String, ModelRef)>,
    /// Heatmap intensity.
    pub intensity: f32,
}

impl GroupUniforms {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            z_layer: 0,
            z_index: 0,
            unit: Unit::Pixel,
            fill: None,
            stroke: None,
            stroke_width: 0.0,
            opacity: 1.0,
            offset: [0.0, 0.0],
            alignment: Alignment::default(),
            rotation: 0.0,
            cap: LineCap::default(),
            join: LineJoin::default(),
            dash: None,
            dash_image: None,
            dash_region: None,
            altitude: false,
            depth_test: kind_depth_tested(kind),
            font: None,
            model: None,
            intensity: 1.0,
        }
    }

    /// Deterministic batching key.
    pub fn signature(&self) -> String {
        let mut sig = String::with_capacity(96);
        let _ = write!(
            sig,
            "{}:{}:{}:{}",
            self.z_layer,
            self.z_index,
            self.kind.as_str(),
            self.unit.suffix()
        );
        if let Some(fill) = self.fill {
            let _ = write!(sig, "|f{}", color_key(fill));
        }
        if let Some(stroke) = self.stroke {
            let _ = write!(sig, "|s{}/{}", color_key(stroke), self.stroke_width);
        }
        let _ = write!(sig, "|o{}", self.opacity);
        if self.offset != [0.0, 0.0] {
            let _ = write!(sig, "|off{},{}", self.offset[0], self.offset[1]);
        }
        let _ = write!(sig, "|al{}|r{}", self.alignment.as_str(), self.rotation);
        if matches!(self.kind, PrimitiveKind::Line | PrimitiveKind::Polygon) {
            let _ = write!(sig, "|{}/{}", self.cap.as_str(), self.join.as_str());
        }
        if let Some(dash) = self.dash {
            let _ = write!(sig, "|d{}", dash.row);
        }
        if let Some(image) = &self.dash_image {
            let _ = write!(sig, "|di{image}");
        }
        let _ = write!(sig, "|h{}|z{}", self.altitude as u8, self.depth_test as u8);
        if let Some(font) = &self.font {
            let _ = write!(sig, "|t{font}");
        }
        if let Some((src, _)) = &self.model {
            let _ = write!(sig, "|m{src}");
        }
        if self.kind == PrimitiveKind::Heatmap {
            let _ = write!(sig, "|i{}", self.intensity);
        }
        sig
    }
}

/// 3-D kinds are depth tested by default, flat ones are not.
fn kind_depth_tested(kind: PrimitiveKind) -> bool {
    matches!(
        kind,
        PrimitiveKind::Extrude | PrimitiveKind::Box | PrimitiveKind::Sphere | PrimitiveKind::Model
    )
}

fn color_key(c: [f32; 4]) -> String {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("{:02x}{:02x}{:02x}{:02x}", q(c[0]), q(c[1]), q(c[2]), q(c[3]))
}

/// Snap an opacity to `steps` levels.
pub fn quantize_opacity(opacity: f32, steps: u32) -> f32 {
    let steps = steps.max(1) as f32;
    (opacity.clamp(0.0, 1.0) * steps).round() / steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(width: f32) -> GroupUniforms {
        GroupUniforms {
            stroke: Some([0.0, 0.0, 0.0, 1.0]),
            stroke_width: width,
            ..GroupUniforms::new(PrimitiveKind::Line)
        }
    }

    #[test]
    fn test_equal_uniforms_share_signature() {
        assert_eq!(line(2.0).signature(), line(2.0).signature());
    }

    #[test]
    fn test_each_component_changes_signature() {
        let base = line(2.0).signature();
        assert_ne!(base, line(3.0).signature());

        let mut z = line(2.0);
        z.z_index = 1;
        assert_ne!(base, z.signature());

        let mut unit = line(2.0);
        unit.unit = Unit::Meter;
        assert_ne!(base, unit.signature());

        let mut opacity = line(2.0);
        opacity.opacity = 0.5;
        assert_ne!(base, opacity.signature());

        let mut dashed = line(2.0);
        dashed.dash = Some(DashRef { row: 0, length: 8.0 });
        assert_ne!(base, dashed.signature());

        let mut fill = line(2.0);
        fill.fill = Some([1.0, 1.0, 1.0, 1.0]);
        assert_ne!(base, fill.signature());
    }

    #[test]
    fn test_opacity_quantization() {
        assert_eq!(quantize_opacity(0.504, 100), 0.5);
        assert_eq!(quantize_opacity(1.7, 100), 1.0);
        assert_eq!(quantize_opacity(0.26, 4), 0.25);
    }

    #[test]
    fn test_extrusions_are_depth_tested() {
        assert!(GroupUniforms::new(PrimitiveKind::Extrude).depth_test);
        assert!(!GroupUniforms::new(PrimitiveKind::Text).depth_test);
    }
}
