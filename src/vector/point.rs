//! Anchored primitives: billboard quads (circle, rect, sphere, heatmap),
//! boxes, vertical lines and model instances.
//!
//! Anchors are stored with [`encode_position`], so every shape of a group
//! can be culled by the visibility bit without touching its geometry.

use crate::core::encoding::encode_position;
use crate::vector::data::{FillVertex, ModelInstance, PointVertex, ShapeVertex};
use glam::{Vec2, Vec3};

/// Where one anchored primitive is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    /// Tile pixels, altitude in meters.
    pub position: Vec3,
    /// Orientation in radians (line direction for line placements).
    pub angle: f32,
    pub visible: bool,
}

impl Anchor {
    pub fn new(position: Vec3, angle: f32, visible: bool) -> Self {
        Self {
            position,
            angle,
            visible,
        }
    }

    pub fn point(&self) -> Vec2 {
        self.position.truncate()
    }

    pub fn encoded(&self) -> [i16; 2] {
        encode_position([self.position.x, self.position.y], self.visible)
    }
}

const QUAD: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Billboard quad with half extents `half` (group units).
pub fn emit_quad(
    vertices: &mut Vec<PointVertex>,
    indices: &mut Vec<u32>,
    anchor: &Anchor,
    half: Vec2,
    weight: f32,
) {
    let base = vertices.len() as u32;
    let encoded = anchor.encoded();
    for corner in [
        [-half.x, -half.y],
        [half.x, -half.y],
        [half.x, half.y],
        [-half.x, half.y],
    ] {
        vertices.push(PointVertex {
            anchor: encoded,
            corner,
            altitude: anchor.position.z,
            weight,
        });
    }
    indices.extend(QUAD.iter().map(|i| base + i));
}

/// Axis-aligned box standing on the anchor: 6 faces with flat normals.
pub fn emit_box(
    vertices: &mut Vec<ShapeVertex>,
    indices: &mut Vec<u32>,
    anchor: &Anchor,
    half: Vec2,
    height: f32,
) {
    let (x, y, h) = (half.x, half.y, height);
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([0.0, 0.0, 1.0], [[-x, -y, h], [x, -y, h], [x, y, h], [-x, y, h]]),
        ([0.0, 0.0, -1.0], [[-x, y, 0.0], [x, y, 0.0], [x, -y, 0.0], [-x, -y, 0.0]]),
        ([1.0, 0.0, 0.0], [[x, -y, 0.0], [x, y, 0.0], [x, y, h], [x, -y, h]]),
        ([-1.0, 0.0, 0.0], [[-x, y, 0.0], [-x, -y, 0.0], [-x, -y, h], [-x, y, h]]),
        ([0.0, 1.0, 0.0], [[x, y, 0.0], [-x, y, 0.0], [-x, y, h], [x, y, h]]),
        ([0.0, -1.0, 0.0], [[-x, -y, 0.0], [x, -y, 0.0], [x, -y, h], [-x, -y, h]]),
    ];
    let encoded = anchor.encoded();
    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        for local in corners {
            vertices.push(ShapeVertex {
                anchor: encoded,
                local: [local[0], local[1], local[2] + anchor.position.z],
                normal,
            });
        }
        indices.extend(QUAD.iter().map(|i| base + i));
    }
}

/// Vertical segment from the anchor up by `height` (line list).
pub fn emit_vertical_line(
    vertices: &mut Vec<FillVertex>,
    indices: &mut Vec<u32>,
    anchor: &Anchor,
    height: f32,
) {
    let base = vertices.len() as u32;
    let position = [anchor.position.x, anchor.position.y];
    vertices.push(FillVertex {
        position,
        altitude: anchor.position.z,
    });
    vertices.push(FillVertex {
        position,
        altitude: anchor.position.z + height,
    });
    indices.extend([base, base + 1]);
}

/// One instance of the group's model.
pub fn emit_model(instances: &mut Vec<ModelInstance>, anchor: &Anchor, rotation: f32, scale: f32) {
    instances.push(ModelInstance {
        anchor: anchor.encoded(),
        altitude: anchor.position.z,
        rotation: rotation + anchor.angle,
        scale,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoding::decode_point;

    fn anchor() -> Anchor {
        Anchor::new(Vec3::new(12.5, 40.0, 3.0), 0.0, true)
    }

    #[test]
    fn test_quad_corners() {
        let (mut vertices, mut indices) = (Vec::new(), Vec::new());
        emit_quad(&mut vertices, &mut indices, &anchor(), Vec2::new(4.0, 2.0), 1.0);
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(vertices[2].corner, [4.0, 2.0]);
        assert_eq!(decode_point(vertices[0].anchor[0]), (12.5, true));
    }

    #[test]
    fn test_box_has_six_faces() {
        let (mut vertices, mut indices) = (Vec::new(), Vec::new());
        emit_box(&mut vertices, &mut indices, &anchor(), Vec2::splat(5.0), 10.0);
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        let top = vertices.iter().filter(|v| v.normal == [0.0, 0.0, 1.0]);
        assert!(top.clone().count() == 4 && top.into_iter().all(|v| v.local[2] == 13.0));
    }

    #[test]
    fn test_vertical_line_is_line_list() {
        let (mut vertices, mut indices) = (Vec::new(), Vec::new());
        emit_vertical_line(&mut vertices, &mut indices, &anchor(), 50.0);
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(vertices[1].altitude, 53.0);
    }

    #[test]
    fn test_model_instance_adds_anchor_angle() {
        let mut instances = Vec::new();
        let mut a = anchor();
        a.angle = 0.5;
        emit_model(&mut instances, &a, 1.0, 2.0);
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].rotation, 1.5);
        assert_eq!(instances[0].scale, 2.0);
    }
}
