//! Text and icon quads.
//!
//! Both draw textured quads from a shared atlas. Texture coordinates are in
//! texels; the horizontal one carries the label's quantized rotation in its
//! low bits (see [`pack_texcoord`]).

use crate::core::atlas::AtlasRegion;
use crate::core::encoding::{pack_texcoord, quantize_rotation};
use crate::labels::layout::TextLayout;
use crate::vector::data::GlyphVertex;
use crate::vector::point::Anchor;
use glam::Vec2;

fn push_quad(
    vertices: &mut Vec<GlyphVertex>,
    indices: &mut Vec<u32>,
    anchor: &Anchor,
    min: Vec2,
    max: Vec2,
    region: &AtlasRegion,
) {
    let base = vertices.len() as u32;
    let encoded = anchor.encoded();
    let rotation = quantize_rotation(anchor.angle);
    let (u0, v0) = (region.x, region.y);
    let (u1, v1) = (region.x + region.width, region.y + region.height);
    for (offset, u, v) in [
        ([min.x, min.y], u0, v0),
        ([max.x, min.y], u1, v0),
        ([max.x, max.y], u1, v1),
        ([min.x, max.y], u0, v1),
    ] {
        vertices.push(GlyphVertex {
            anchor: encoded,
            offset,
            texcoord: [pack_texcoord(u, rotation), v],
            altitude: anchor.position.z,
        });
    }
    indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
}

/// One quad per shaped glyph, shifted by `offset` pixels.
pub fn emit_text(
    vertices: &mut Vec<GlyphVertex>,
    indices: &mut Vec<u32>,
    anchor: &Anchor,
    layout: &TextLayout,
    offset: Vec2,
) {
    for quad in &layout.quads {
        push_quad(
            vertices,
            indices,
            anchor,
            quad.min + offset,
            quad.max + offset,
            &quad.region,
        );
    }
}

/// Icon quad of `size` pixels centered on the anchor plus `offset`.
pub fn emit_icon(
    vertices: &mut Vec<GlyphVertex>,
    indices: &mut Vec<u32>,
    anchor: &Anchor,
    region: &AtlasRegion,
    size: Vec2,
    offset: Vec2,
) {
    let half = size * 0.5;
    push_quad(vertices, indices, anchor, offset - half, offset + half, region);
}

/// Box of an icon relative to its anchor: `[x0, y0, x1, y1]`.
pub fn icon_bounds(size: Vec2, offset: Vec2) -> [f32; 4] {
    let half = size * 0.5;
    [offset.x - half.x, offset.y - half.y, offset.x + half.x, offset.y + half.y]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoding::unpack_texcoord;
    use crate::labels::atlas::GlyphAtlas;
    use crate::labels::layout::{layout_text, TextAnchor, TextStyle};
    use glam::Vec3;

    fn anchor(angle: f32) -> Anchor {
        Anchor::new(Vec3::new(100.0, 50.0, 0.0), angle, true)
    }

    #[test]
    fn test_text_quads_per_glyph() {
        let mut atlas = GlyphAtlas::default();
        let style = TextStyle {
            font: "sans",
            size: 16.0,
            wrap_width: None,
            anchor: TextAnchor::Center,
        };
        let layout = layout_text(&mut atlas, "Main St", &style).unwrap();
        let (mut vertices, mut indices) = (Vec::new(), Vec::new());
        emit_text(&mut vertices, &mut indices, &anchor(0.0), &layout, Vec2::ZERO);
        // The space has no quad.
        assert_eq!(vertices.len(), 6 * 4);
        assert_eq!(indices.len(), 6 * 6);
    }

    #[test]
    fn test_rotation_rides_in_texcoord() {
        let region = AtlasRegion {
            x: 32,
            y: 8,
            width: 16,
            height: 16,
        };
        let (mut vertices, mut indices) = (Vec::new(), Vec::new());
        let angle = std::f32::consts::FRAC_PI_2;
        emit_icon(&mut vertices, &mut indices, &anchor(angle), &region, Vec2::splat(16.0), Vec2::ZERO);
        let (u, rotation) = unpack_texcoord(vertices[1].texcoord[0]);
        assert_eq!(u, 48);
        assert_eq!(rotation, 256);
        assert_eq!(vertices[2].texcoord[1], 24);
        assert_eq!(vertices[0].offset, [-8.0, -8.0]);
    }

    #[test]
    fn test_icon_bounds() {
        assert_eq!(
            icon_bounds(Vec2::new(10.0, 4.0), Vec2::new(0.0, -10.0)),
            [-5.0, -12.0, 5.0, -8.0]
        );
    }
}
