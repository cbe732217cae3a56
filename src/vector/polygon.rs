//! Polygon fill emitter.
//!
//! Rings are projected once per feature part and triangulated by ear
//! clipping. On unclipped tiles the triangle indices are stored on the
//! [`Polygon`] and reused at every zoom level; clipped geometry differs per
//! tile and is triangulated each time.

use crate::geo::{Polygon, Tile};
use crate::vector::data::FillVertex;
use crate::vector::earcut::triangulate;
use glam::{Vec2, Vec3};
use std::borrow::Cow;

/// Where a polygon's triangle indices came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangulationSource {
    Computed,
    Cached,
}

/// Project every ring into tile pixels, altitude in `z`.
pub fn project_rings(tile: &Tile, polygon: &Polygon) -> Vec<Vec<Vec3>> {
    polygon
        .rings()
        .iter()
        .map(|ring| ring.iter().map(|&c| tile.project_with_altitude(c)).collect())
        .collect()
}

fn flatten_2d(rings: &[Vec<Vec3>]) -> Vec<Vec<Vec2>> {
    rings
        .iter()
        .map(|ring| ring.iter().map(|p| p.truncate()).collect())
        .collect()
}

/// Triangle indices into the flattened `rings`.
pub fn polygon_triangles<'a>(
    tile: &Tile,
    polygon: &'a Polygon,
    rings: &[Vec<Vec3>],
) -> (Cow<'a, [u32]>, TriangulationSource) {
    if tile.clipped {
        return (
            Cow::Owned(triangulate(&flatten_2d(rings))),
            TriangulationSource::Computed,
        );
    }
    if let Some(cached) = polygon.cached_triangulation() {
        return (Cow::Borrowed(cached), TriangulationSource::Cached);
    }
    let indices = triangulate(&flatten_2d(rings));
    (
        Cow::Borrowed(polygon.cache_triangulation(indices)),
        TriangulationSource::Computed,
    )
}

/// Append the fill of `rings` using precomputed `triangles`.
pub fn emit_fill(
    vertices: &mut Vec<FillVertex>,
    indices: &mut Vec<u32>,
    rings: &[Vec<Vec3>],
    triangles: &[u32],
    altitude: bool,
) {
    if triangles.is_empty() {
        return;
    }
    let base = vertices.len() as u32;
    vertices.extend(rings.iter().flatten().map(|p| FillVertex {
        position: [p.x, p.y],
        altitude: if altitude { p.z } else { 0.0 },
    }));
    indices.extend(triangles.iter().map(|&i| base + i));
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn square(min: f64, max: f64) -> Vec<DVec3> {
        vec![
            DVec3::new(min, min, 0.0),
            DVec3::new(max, min, 0.0),
            DVec3::new(max, max, 0.0),
            DVec3::new(min, max, 0.0),
        ]
    }

    fn polygon() -> Polygon {
        Polygon::new(vec![square(0.0, 10.0), square(3.0, 7.0)]).unwrap()
    }

    #[test]
    fn test_unclipped_triangulation_is_cached() {
        let tile = Tile::new(0, 0, 0, 256);
        let polygon = polygon();
        let rings = project_rings(&tile, &polygon);

        let (first, source) = polygon_triangles(&tile, &polygon, &rings);
        assert_eq!(source, TriangulationSource::Computed);
        assert_eq!(first.len(), 24);
        let first = first.into_owned();

        let (second, source) = polygon_triangles(&tile, &polygon, &rings);
        assert_eq!(source, TriangulationSource::Cached);
        assert_eq!(&*second, first.as_slice());
    }

    #[test]
    fn test_clipped_triangulation_is_recomputed() {
        let tile = Tile::new(0, 0, 0, 256).with_clipped(true);
        let polygon = polygon();
        let rings = project_rings(&tile, &polygon);
        for _ in 0..2 {
            let (indices, source) = polygon_triangles(&tile, &polygon, &rings);
            assert_eq!(source, TriangulationSource::Computed);
            assert_eq!(indices.len(), 24);
        }
        assert!(polygon.cached_triangulation().is_none());
    }

    #[test]
    fn test_emit_fill_offsets_indices() {
        let tile = Tile::new(0, 0, 0, 256);
        let polygon = polygon();
        let rings = project_rings(&tile, &polygon);
        let (triangles, _) = polygon_triangles(&tile, &polygon, &rings);

        let (mut vertices, mut indices) = (Vec::new(), Vec::new());
        emit_fill(&mut vertices, &mut indices, &rings, &triangles, false);
        emit_fill(&mut vertices, &mut indices, &rings, &triangles, false);
        assert_eq!(vertices.len(), 16);
        assert_eq!(indices.len(), 48);
        assert!(indices[24..].iter().all(|&i| (8..16).contains(&i)));
    }
}
