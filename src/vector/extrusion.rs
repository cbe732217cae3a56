//! Polygon extrusion: a flat roof plus one vertical quad per visible edge.
//!
//! Heights are in meters and stored as-is in `z`; the group's unit scale
//! brings them into pixel space. Wall normals point away from the solid:
//! the outward side of a ring follows from the sign of its area, and holes
//! flip that sign so their walls face into the courtyard.

use crate::geo::Tile;
use crate::vector::data::ExtrudeVertex;
use crate::vector::earcut::signed_area;
use glam::{Vec2, Vec3};

/// Append roof and walls. Returns the number of walls emitted.
pub fn emit_extrusion(
    vertices: &mut Vec<ExtrudeVertex>,
    indices: &mut Vec<u32>,
    tile: &Tile,
    rings: &[Vec<Vec3>],
    triangles: &[u32],
    height: f32,
    base: f32,
) -> usize {
    // Roof
    let roof = vertices.len() as u32;
    vertices.extend(rings.iter().flatten().map(|p| ExtrudeVertex {
        position: [p.x, p.y, height],
        normal: [0.0, 0.0, 1.0],
    }));
    indices.extend(triangles.iter().map(|&i| roof + i));

    let mut walls = 0;
    for (ring_idx, ring) in rings.iter().enumerate() {
        let flat: Vec<Vec2> = ring.iter().map(|p| p.truncate()).collect();
        let area = signed_area(&flat);
        if area == 0.0 {
            continue;
        }
        let outward = if ring_idx == 0 { area.signum() } else { -area.signum() };

        let n = flat.len();
        for i in 0..n {
            let (p0, p1) = (flat[i], flat[(i + 1) % n]);
            if !is_wall_visible(tile, p0, p1) {
                continue;
            }
            let d = p1 - p0;
            let normal = Vec2::new(d.y, -d.x).normalize_or_zero() * outward;
            let normal = [normal.x, normal.y, 0.0];

            let start = vertices.len() as u32;
            vertices.extend([
                ExtrudeVertex { position: [p0.x, p0.y, base], normal },
                ExtrudeVertex { position: [p1.x, p1.y, base], normal },
                ExtrudeVertex { position: [p1.x, p1.y, height], normal },
                ExtrudeVertex { position: [p0.x, p0.y, height], normal },
            ]);
            let quad: [u32; 6] = if outward > 0.0 {
                [0, 1, 2, 0, 2, 3]
            } else {
                [0, 2, 1, 0, 3, 2]
            };
            indices.extend(quad.iter().map(|i| start + i));
            walls += 1;
        }
    }
    walls
}

/// A wall is drawn when its edge has length on screen and touches the tile.
pub fn is_wall_visible(tile: &Tile, p0: Vec2, p1: Vec2) -> bool {
    p1 != p0 && (tile.contains(p0) || tile.contains(p1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::earcut::triangulate;

    fn ring(points: &[(f32, f32)]) -> Vec<Vec3> {
        points.iter().map(|&(x, y)| Vec3::new(x, y, 0.0)).collect()
    }

    fn extrude(rings: &[Vec<Vec3>]) -> (Vec<ExtrudeVertex>, Vec<u32>, usize) {
        let tile = Tile::new(0, 0, 1, 256);
        let flat: Vec<Vec<Vec2>> = rings
            .iter()
            .map(|r| r.iter().map(|p| p.truncate()).collect())
            .collect();
        let triangles = triangulate(&flat);
        let (mut vertices, mut indices) = (Vec::new(), Vec::new());
        let walls = emit_extrusion(&mut vertices, &mut indices, &tile, rings, &triangles, 30.0, 0.0);
        (vertices, indices, walls)
    }

    fn wall_normals(vertices: &[ExtrudeVertex]) -> Vec<[f32; 3]> {
        vertices
            .iter()
            .filter(|v| v.normal[2] == 0.0)
            .step_by(4)
            .map(|v| v.normal)
            .collect()
    }

    #[test]
    fn test_square_building() {
        let square = ring(&[(10.0, 10.0), (20.0, 10.0), (20.0, 20.0), (10.0, 20.0)]);
        let (vertices, indices, walls) = extrude(&[square]);
        assert_eq!(walls, 4);
        assert_eq!(vertices.len(), 4 + 16);
        assert_eq!(indices.len(), 6 + 24);
        assert_eq!(wall_normals(&vertices)[0], [0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_winding_does_not_change_normals() {
        let mut square = ring(&[(10.0, 10.0), (20.0, 10.0), (20.0, 20.0), (10.0, 20.0)]);
        let (forward, _, _) = extrude(&[square.clone()]);
        square.reverse();
        let (backward, _, _) = extrude(&[square]);

        let mut a = wall_normals(&forward);
        let mut b = wall_normals(&backward);
        let key = |n: &[f32; 3]| (n[0] * 10.0) as i32 * 100 + (n[1] * 10.0) as i32;
        a.sort_by_key(key);
        b.sort_by_key(key);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hole_walls_face_inward() {
        let outer = ring(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        let hole = ring(&[(40.0, 40.0), (60.0, 40.0), (60.0, 60.0), (40.0, 60.0)]);
        let (vertices, _, walls) = extrude(&[outer, hole]);
        assert_eq!(walls, 8);
        // First hole wall runs along y = 40 and faces the hole (+y).
        assert_eq!(wall_normals(&vertices)[4], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_walls_outside_tile_are_skipped() {
        let tile = Tile::new(0, 0, 1, 256);
        assert!(is_wall_visible(&tile, Vec2::new(250.0, 10.0), Vec2::new(300.0, 10.0)));
        assert!(!is_wall_visible(&tile, Vec2::new(300.0, 10.0), Vec2::new(400.0, 10.0)));
        assert!(!is_wall_visible(&tile, Vec2::new(10.0, 10.0), Vec2::new(10.0, 10.0)));

        let partial = ring(&[(200.0, 10.0), (300.0, 10.0), (300.0, 20.0), (200.0, 20.0)]);
        let (_, _, walls) = extrude(&[partial]);
        assert_eq!(walls, 3);
    }
}
