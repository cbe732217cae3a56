//! R-tree backed collision arbiter.
//!
//! Placements live in world pixel space at the tile's zoom so labels of
//! neighbouring tiles collide with each other. Each entry remembers its tile
//! so a tile can release its placements before being recompiled.

use crate::geo::TileKey;
use crate::labels::collision::{CollisionArbiter, CollisionRequest, PlacementRecord};
use rstar::{RTree, RTreeObject, AABB};

/// A placed label box for R-tree storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedBounds {
    pub id: u64,
    pub tile: TileKey,
    /// Bounding box [x0, y0, x1, y1] in world pixels.
    pub bounds: [f64; 4],
}

impl RTreeObject for PlacedBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds[0], self.bounds[1]],
            [self.bounds[2], self.bounds[3]],
        )
    }
}

/// First-come collision arbiter over an R-tree.
#[derive(Debug, Default)]
pub struct RTreeArbiter {
    tree: RTree<PlacedBounds>,
    next_id: u64,
}

impl RTreeArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a box would collide without inserting.
    pub fn check_collision(&self, bounds: [f64; 4]) -> bool {
        let envelope = AABB::from_corners([bounds[0], bounds[1]], [bounds[2], bounds[3]]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .any(|existing| rects_overlap(bounds, existing.bounds))
    }

    /// Get the number of stored placements.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }
}

impl CollisionArbiter for RTreeArbiter {
    fn insert(&mut self, request: &CollisionRequest) -> Option<PlacementRecord> {
        let bounds = request.world_bounds();
        if bounds[0] >= bounds[2] || bounds[1] >= bounds[3] || self.check_collision(bounds) {
            return None;
        }
        self.next_id += 1;
        self.tree.insert(PlacedBounds {
            id: self.next_id,
            tile: request.tile,
            bounds,
        });
        Some(PlacementRecord {
            id: self.next_id,
            bounds,
        })
    }

    fn release_tile(&mut self, tile: &TileKey) {
        let kept: Vec<PlacedBounds> = self
            .tree
            .iter()
            .filter(|entry| entry.tile != *tile)
            .copied()
            .collect();
        if kept.len() != self.tree.size() {
            self.tree = RTree::bulk_load(kept);
        }
    }
}

/// Check if two axis-aligned rectangles overlap.
#[inline]
fn rects_overlap(a: [f64; 4], b: [f64; 4]) -> bool {
    a[0] < b[2] && a[2] > b[0] && a[1] < b[3] && a[3] > b[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tile: TileKey, x: f32, y: f32) -> CollisionRequest {
        CollisionRequest {
            x,
            y,
            z: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            half_width: 10.0,
            half_height: 10.0,
            tile,
            tile_size: 256,
            priority: 0.0,
            slope: None,
        }
    }

    const A: TileKey = TileKey { x: 0, y: 0, z: 1 };
    const B: TileKey = TileKey { x: 1, y: 0, z: 1 };

    #[test]
    fn test_no_collision() {
        let mut arbiter = RTreeArbiter::new();
        assert!(arbiter.insert(&request(A, 20.0, 20.0)).is_some());
        assert!(arbiter.insert(&request(A, 60.0, 60.0)).is_some());
        assert_eq!(arbiter.len(), 2);
    }

    #[test]
    fn test_collision() {
        let mut arbiter = RTreeArbiter::new();
        assert!(arbiter.insert(&request(A, 20.0, 20.0)).is_some());
        assert!(arbiter.insert(&request(A, 30.0, 30.0)).is_none());
        assert_eq!(arbiter.len(), 1);
    }

    #[test]
    fn test_collides_across_tile_border() {
        let mut arbiter = RTreeArbiter::new();
        assert!(arbiter.insert(&request(A, 250.0, 20.0)).is_some());
        assert!(arbiter.insert(&request(B, 2.0, 20.0)).is_none());
    }

    #[test]
    fn test_release_tile() {
        let mut arbiter = RTreeArbiter::new();
        arbiter.insert(&request(A, 20.0, 20.0));
        arbiter.insert(&request(B, 20.0, 20.0));
        arbiter.release_tile(&A);
        assert_eq!(arbiter.len(), 1);
        assert!(arbiter.insert(&request(A, 20.0, 20.0)).is_some());
        assert!(arbiter.insert(&request(B, 20.0, 20.0)).is_none());
    }
}
