//! Draw groups, vertex formats and geometry emitters.
//! Emitters append to typed buffers of one draw group and never allocate GPU resources.

pub mod data;
pub mod earcut;
pub mod extrusion;
pub mod group;
pub mod layer;
pub mod line;
pub mod line_processor;
pub mod point;
pub mod polygon;
pub mod signature;
pub mod text;

// Re-export main types for convenience
pub use data::{
    ExtrudeVertex, FillVertex, GlyphVertex, GroupVertex, LineVertex, ModelInstance, PointVertex,
    ShapeVertex, VertexData,
};
pub use group::{DrawGroup, DrawGroupTable, IdOffset};
pub use layer::{sort_by_draw_order, DrawOrder};
pub use line::{emit_line, LineCap, LineJoin, Ribbon};
pub use line_processor::{
    AnchorMode, LineGeometryProcessor, Placement, PlacementParams, TrimWindow,
};
pub use point::Anchor;
pub use polygon::TriangulationSource;
pub use signature::{quantize_opacity, Alignment, GroupUniforms};
