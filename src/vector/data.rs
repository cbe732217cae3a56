//! Packed vertex formats.
//!
//! Every format is `Pod` so buffers can be handed to the renderer as bytes,
//! and carries its `wgpu` attribute layout. Anchored primitives (text, icons,
//! point shapes) store their anchor with [`encode_position`](crate::core::encode_position).

use wgpu::VertexAttribute;

/// Glyph or icon quad corner.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlyphVertex {
    pub anchor: [i16; 2],   // Fixed-point anchor + visibility bit
    pub offset: [f32; 2],   // Corner offset from the anchor in pixels
    pub texcoord: [u32; 2], // [u << 10 | rotation, v] in texels
    pub altitude: f32,      // Meters
}

/// Billboard quad corner for circles, rects, spheres and heatmap points.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointVertex {
    pub anchor: [i16; 2],
    pub corner: [f32; 2], // Corner offset in group units
    pub altitude: f32,
    pub weight: f32, // Heatmap weight, 1 otherwise
}

/// Stroked line vertex. The final position is
/// `position + normal * stroke_width / 2` in the shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 2], // On the path, tile pixels
    pub normal: [f32; 2],   // Miter-scaled extrusion direction
    pub advancement: f32,   // Distance along the path, for dashes
    pub altitude: f32,
}

/// Flat polygon fill vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FillVertex {
    pub position: [f32; 2],
    pub altitude: f32,
}

/// Extruded polygon vertex (roof or wall).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ExtrudeVertex {
    pub position: [f32; 3], // x, y in tile pixels, z in meters
    pub normal: [f32; 3],
}

/// Box vertex relative to its anchor.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShapeVertex {
    pub anchor: [i16; 2],
    pub local: [f32; 3], // Offset from the anchor in group units
    pub normal: [f32; 3],
}

/// One 3-D model instance.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelInstance {
    pub anchor: [i16; 2],
    pub altitude: f32,
    pub rotation: f32, // Radians around the vertical axis
    pub scale: f32,
}

/// Vertex formats stored in draw groups.
pub trait GroupVertex: bytemuck::Pod {
    const ATTRIBUTES: &'static [VertexAttribute];

    fn buffer(data: &mut VertexData) -> Option<&mut Vec<Self>>;
}

macro_rules! group_vertex {
    ($ty:ty, $variant:ident, [$($loc:expr => $fmt:ident),* $(,)?]) => {
        impl GroupVertex for $ty {
            const ATTRIBUTES: &'static [VertexAttribute] =
                &wgpu::vertex_attr_array![$($loc => $fmt),*];

            fn buffer(data: &mut VertexData) -> Option<&mut Vec<Self>> {
                match data {
                    VertexData::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

group_vertex!(GlyphVertex, Glyph, [0 => Sint16x2, 1 => Float32x2, 2 => Uint32x2, 3 => Float32]);
group_vertex!(PointVertex, Point, [0 => Sint16x2, 1 => Float32x2, 2 => Float32, 3 => Float32]);
group_vertex!(LineVertex, Line, [0 => Float32x2, 1 => Float32x2, 2 => Float32, 3 => Float32]);
group_vertex!(FillVertex, Fill, [0 => Float32x2, 1 => Float32]);
group_vertex!(ExtrudeVertex, Extrude, [0 => Float32x3, 1 => Float32x3]);
group_vertex!(ShapeVertex, Shape, [0 => Sint16x2, 1 => Float32x3, 2 => Float32x3]);
group_vertex!(ModelInstance, Model, [0 => Sint16x2, 1 => Float32, 2 => Float32, 3 => Float32]);

/// Typed vertex storage of one draw group.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexData {
    Glyph(Vec<GlyphVertex>),
    Point(Vec<PointVertex>),
    Line(Vec<LineVertex>),
    Fill(Vec<FillVertex>),
    Extrude(Vec<ExtrudeVertex>),
    Shape(Vec<ShapeVertex>),
    Model(Vec<ModelInstance>),
}

impl VertexData {
    pub fn len(&self) -> usize {
        match self {
            VertexData::Glyph(v) => v.len(),
            VertexData::Point(v) => v.len(),
            VertexData::Line(v) => v.len(),
            VertexData::Fill(v) => v.len(),
            VertexData::Extrude(v) => v.len(),
            VertexData::Shape(v) => v.len(),
            VertexData::Model(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            VertexData::Glyph(v) => bytemuck::cast_slice(v),
            VertexData::Point(v) => bytemuck::cast_slice(v),
            VertexData::Line(v) => bytemuck::cast_slice(v),
            VertexData::Fill(v) => bytemuck::cast_slice(v),
            VertexData::Extrude(v) => bytemuck::cast_slice(v),
            VertexData::Shape(v) => bytemuck::cast_slice(v),
            VertexData::Model(v) => bytemuck::cast_slice(v),
        }
    }

    pub fn stride(&self) -> usize {
        match self {
            VertexData::Glyph(_) => std::mem::size_of::<GlyphVertex>(),
            VertexData::Point(_) => std::mem::size_of::<PointVertex>(),
            VertexData::Line(_) => std::mem::size_of::<LineVertex>(),
            VertexData::Fill(_) => std::mem::size_of::<FillVertex>(),
            VertexData::Extrude(_) => std::mem::size_of::<ExtrudeVertex>(),
            VertexData::Shape(_) => std::mem::size_of::<ShapeVertex>(),
            VertexData::Model(_) => std::mem::size_of::<ModelInstance>(),
        }
    }

    pub fn attributes(&self) -> &'static [VertexAttribute] {
        match self {
            VertexData::Glyph(_) => GlyphVertex::ATTRIBUTES,
            VertexData::Point(_) => PointVertex::ATTRIBUTES,
            VertexData::Line(_) => LineVertex::ATTRIBUTES,
            VertexData::Fill(_) => FillVertex::ATTRIBUTES,
            VertexData::Extrude(_) => ExtrudeVertex::ATTRIBUTES,
            VertexData::Shape(_) => ShapeVertex::ATTRIBUTES,
            VertexData::Model(_) => ModelInstance::ATTRIBUTES,
        }
    }
}

/// Byte size of a vertex format as declared by its attributes.
pub fn attributes_size(attributes: &[VertexAttribute]) -> u64 {
    attributes
        .iter()
        .map(|a| a.offset + a.format.size())
        .max()
        .unwrap_or(0)
}

/// Check a vertex format's attribute layout against its Rust size.
pub fn layout_matches<T: GroupVertex>() -> bool {
    attributes_size(T::ATTRIBUTES) == std::mem::size_of::<T>() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_match_struct_sizes() {
        assert!(layout_matches::<GlyphVertex>());
        assert!(layout_matches::<PointVertex>());
        assert!(layout_matches::<LineVertex>());
        assert!(layout_matches::<FillVertex>());
        assert!(layout_matches::<ExtrudeVertex>());
        assert!(layout_matches::<ShapeVertex>());
        assert!(layout_matches::<ModelInstance>());
    }

    #[test]
    fn test_vertex_sizes() {
        assert_eq!(std::mem::size_of::<GlyphVertex>(), 24);
        assert_eq!(std::mem::size_of::<PointVertex>(), 20);
        assert_eq!(std::mem::size_of::<LineVertex>(), 24);
        assert_eq!(std::mem::size_of::<FillVertex>(), 12);
        assert_eq!(std::mem::size_of::<ModelInstance>(), 16);
    }

    #[test]
    fn test_bytes_follow_vertices() {
        let mut data = VertexData::Fill(Vec::new());
        FillVertex::buffer(&mut data).unwrap().push(FillVertex {
            position: [1.0, 2.0],
            altitude: 0.0,
        });
        assert!(LineVertex::buffer(&mut data).is_none());
        assert_eq!(data.len(), 1);
        assert_eq!(data.as_bytes().len(), data.stride());
    }
}
