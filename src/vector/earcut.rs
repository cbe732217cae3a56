//! Ear-clipping triangulation of polygons with holes, backed by `earcutr`.
//!
//! Indices address the rings flattened in order (exterior first), so they
//! stay valid for any projection of the same rings. Holes are bridged into
//! the exterior, so a polygon with `n` vertices and `h` holes yields
//! `n + 2h - 2` triangles.

use glam::Vec2;
use log::warn;

/// Twice the signed area of a ring (shoelace).
pub fn signed_area(ring: &[Vec2]) -> f32 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Triangulate `rings` (exterior first, then holes).
pub fn triangulate(rings: &[Vec<Vec2>]) -> Vec<u32> {
    if rings.first().map_or(true, |r| r.len() < 3) {
        return Vec::new();
    }

    let total = rings.iter().map(Vec::len).sum::<usize>();
    let mut data = Vec::with_capacity(total * 2);
    let mut holes = Vec::with_capacity(rings.len() - 1);
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            holes.push(data.len() / 2);
        }
        data.extend(ring.iter().flat_map(|p| [f64::from(p.x), f64::from(p.y)]));
    }

    match earcutr::earcut(&data, &holes, 2) {
        Ok(indices) => indices.into_iter().map(|i| i as u32).collect(),
        Err(err) => {
            warn!("Polygon triangulation failed: {:?}", err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f32, max: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(min, min),
            Vec2::new(max, min),
            Vec2::new(max, max),
            Vec2::new(min, max),
        ]
    }

    fn triangulated_area(rings: &[Vec<Vec2>], indices: &[u32]) -> f32 {
        let points: Vec<Vec2> = rings.iter().flatten().copied().collect();
        indices
            .chunks(3)
            .map(|t| {
                let (a, b, c) = (points[t[0] as usize], points[t[1] as usize], points[t[2] as usize]);
                (b - a).perp_dot(c - a).abs() * 0.5
            })
            .sum()
    }

    #[test]
    fn test_triangle() {
        let rings = vec![vec![Vec2::ZERO, Vec2::X, Vec2::Y]];
        let indices = triangulate(&rings);
        assert_eq!(indices.len(), 3);
    }

    #[test]
    fn test_square_either_winding() {
        let mut ring = square(0.0, 10.0);
        let cw = triangulate(&[ring.clone()]);
        ring.reverse();
        let ccw = triangulate(&[ring.clone()]);
        assert_eq!(cw.len(), 6);
        assert_eq!(ccw.len(), 6);
        assert!((triangulated_area(&[ring], &ccw) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_square_with_hole() {
        let rings = vec![square(0.0, 10.0), square(3.0, 7.0)];
        let indices = triangulate(&rings);
        // 8 vertices, 1 hole: 8 + 2 - 2 triangles
        assert_eq!(indices.len(), 8 * 3);
        assert!((triangulated_area(&rings, &indices) - 84.0).abs() < 1e-3);
        assert!(indices.iter().all(|&i| i < 8));
    }

    #[test]
    fn test_concave_polygon() {
        // L shape
        let ring = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(4.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 4.0),
            Vec2::new(0.0, 4.0),
        ];
        let indices = triangulate(&[ring.clone()]);
        assert_eq!(indices.len(), 4 * 3);
        assert!((triangulated_area(&[ring], &indices) - 7.0).abs() < 1e-3);
    }

    #[test]
    fn test_signed_area_follows_winding() {
        let mut ring = square(0.0, 2.0);
        assert_eq!(signed_area(&ring), 8.0);
        ring.reverse();
        assert_eq!(signed_area(&ring), -8.0);
    }

    #[test]
    fn test_degenerate_input() {
        assert!(triangulate(&[]).is_empty());
        assert!(triangulate(&[vec![Vec2::ZERO, Vec2::X]]).is_empty());
    }
}
