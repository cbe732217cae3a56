//! Line ribbon emitter.
//!
//! Lines are stroked with lyon. Each vertex keeps its position on the path
//! and the miter-scaled normal so the shader can widen the ribbon with the
//! group's stroke width (and its unit scale) at draw time. Altitude is
//! carried as a path attribute and interpolated along the stroke.

use crate::vector::data::LineVertex;
use glam::Vec3;
use log::warn;
use lyon_path::math::point;
use lyon_path::Path;
use lyon_tessellation::{
    BuffersBuilder, StrokeOptions, StrokeTessellator, StrokeVertex, VertexBuffers,
};

/// Line cap styles for polyline endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineCap {
    /// Square cap ending exactly at vertex
    #[default]
    Butt = 0,
    /// Rounded cap extending beyond vertex
    Round = 1,
    /// Square cap extending beyond vertex
    Square = 2,
}

impl LineCap {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "butt" => Some(LineCap::Butt),
            "round" => Some(LineCap::Round),
            "square" => Some(LineCap::Square),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
            LineCap::Square => "square",
        }
    }

    fn to_lyon(self) -> lyon_tessellation::LineCap {
        match self {
            LineCap::Butt => lyon_tessellation::LineCap::Butt,
            LineCap::Round => lyon_tessellation::LineCap::Round,
            LineCap::Square => lyon_tessellation::LineCap::Square,
        }
    }
}

/// Line join styles for polyline vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineJoin {
    /// Sharp miter join with limit
    #[default]
    Miter = 0,
    /// Beveled join (flat cut)
    Bevel = 1,
    /// Rounded join
    Round = 2,
}

impl LineJoin {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "miter" => Some(LineJoin::Miter),
            "bevel" => Some(LineJoin::Bevel),
            "round" => Some(LineJoin::Round),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineJoin::Miter => "miter",
            LineJoin::Bevel => "bevel",
            LineJoin::Round => "round",
        }
    }

    fn to_lyon(self) -> lyon_tessellation::LineJoin {
        match self {
            LineJoin::Miter => lyon_tessellation::LineJoin::Miter,
            LineJoin::Bevel => lyon_tessellation::LineJoin::Bevel,
            LineJoin::Round => lyon_tessellation::LineJoin::Round,
        }
    }
}

/// Stroke parameters of one ribbon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ribbon {
    /// Width in tile pixels, used for cap and join geometry.
    pub width: f32,
    pub start_cap: LineCap,
    pub end_cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
    pub closed: bool,
}

impl Ribbon {
    pub fn new(width: f32, cap: LineCap, join: LineJoin) -> Self {
        Self {
            width,
            start_cap: cap,
            end_cap: cap,
            join,
            miter_limit: 4.0,
            closed: false,
        }
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }
}

/// Append a stroked ribbon along `points` (x, y in tile pixels, z altitude).
/// Returns false when nothing was emitted.
pub fn emit_line(
    vertices: &mut Vec<LineVertex>,
    indices: &mut Vec<u32>,
    points: &[Vec3],
    ribbon: &Ribbon,
) -> bool {
    let min_points = if ribbon.closed { 3 } else { 2 };
    if points.len() < min_points || !(ribbon.width > 0.0) {
        return false;
    }

    let mut builder = Path::builder_with_attributes(1);
    builder.begin(point(points[0].x, points[0].y), &[points[0].z]);
    for p in &points[1..] {
        builder.line_to(point(p.x, p.y), &[p.z]);
    }
    builder.end(ribbon.closed);
    let path = builder.build();

    let options = StrokeOptions::default()
        .with_line_width(ribbon.width)
        .with_start_cap(ribbon.start_cap.to_lyon())
        .with_end_cap(ribbon.end_cap.to_lyon())
        .with_line_join(ribbon.join.to_lyon())
        .with_miter_limit(ribbon.miter_limit.max(1.0));

    let mut buffers: VertexBuffers<LineVertex, u32> = VertexBuffers::new();
    let result = StrokeTessellator::new().tessellate_path(
        &path,
        &options,
        &mut BuffersBuilder::new(&mut buffers, |mut vertex: StrokeVertex| {
            let altitude = vertex.interpolated_attributes().first().copied().unwrap_or(0.0);
            LineVertex {
                position: vertex.position_on_path().to_array(),
                normal: vertex.normal().to_array(),
                advancement: vertex.advancement(),
                altitude,
            }
        }),
    );
    if let Err(err) = result {
        warn!("Line tessellation failed: {:?}", err);
        return false;
    }
    if buffers.indices.is_empty() {
        return false;
    }

    let base = vertices.len() as u32;
    vertices.extend(buffers.vertices);
    indices.extend(buffers.indices.iter().map(|i| base + i));
    true
}
