//! Collision arbiter contract.
//!
//! The compile pipeline submits every label placement that must avoid
//! overlaps. A returned [`PlacementRecord`] stays valid for the rest of the
//! tile's compile pass; `None` means the placement must not be emitted.
//! During the deferred collision phase requests arrive in ascending priority
//! order (lower value first), so a first-come arbiter already honors
//! priorities.

use crate::geo::TileKey;

/// One placement to arbitrate, in tile-local pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRequest {
    pub x: f32,
    pub y: f32,
    /// Altitude in meters.
    pub z: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub half_width: f32,
    pub half_height: f32,
    pub tile: TileKey,
    pub tile_size: u32,
    pub priority: f32,
    /// Rotation of the box in radians for labels following a line.
    pub slope: Option<f32>,
}

impl CollisionRequest {
    /// Axis-aligned bounds in tile-local pixels, rotated boxes included.
    pub fn bounds(&self) -> [f32; 4] {
        let (hw, hh) = match self.slope {
            Some(angle) => {
                let (sin, cos) = angle.sin_cos();
                (
                    (self.half_width * cos).abs() + (self.half_height * sin).abs(),
                    (self.half_width * sin).abs() + (self.half_height * cos).abs(),
                )
            }
            None => (self.half_width, self.half_height),
        };
        let cx = self.x + self.offset_x;
        let cy = self.y + self.offset_y;
        [cx - hw, cy - hh, cx + hw, cy + hh]
    }

    /// Bounds in world pixels at the tile's zoom, so neighbouring tiles
    /// share one coordinate space.
    pub fn world_bounds(&self) -> [f64; 4] {
        let ox = self.tile.x as f64 * self.tile_size as f64;
        let oy = self.tile.y as f64 * self.tile_size as f64;
        let [x0, y0, x1, y1] = self.bounds();
        [ox + x0 as f64, oy + y0 as f64, ox + x1 as f64, oy + y1 as f64]
    }
}

/// Accepted placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRecord {
    pub id: u64,
    /// Bounds in world pixels at the tile's zoom.
    pub bounds: [f64; 4],
}

/// Decides whether a placement may be emitted.
pub trait CollisionArbiter {
    fn insert(&mut self, request: &CollisionRequest) -> Option<PlacementRecord>;

    /// Drop every placement made for `tile`, e.g. before recompiling it.
    fn release_tile(&mut self, tile: &TileKey);
}

/// Arbiter that accepts everything. Useful when labels may overlap freely.
#[derive(Debug, Default, Clone)]
pub struct AcceptAll {
    next_id: u64,
}

impl CollisionArbiter for AcceptAll {
    fn insert(&mut self, request: &CollisionRequest) -> Option<PlacementRecord> {
        self.next_id += 1;
        Some(PlacementRecord {
            id: self.next_id,
            bounds: request.world_bounds(),
        })
    }

    fn release_tile(&mut self, _tile: &TileKey) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(slope: Option<f32>) -> CollisionRequest {
        CollisionRequest {
            x: 10.0,
            y: 10.0,
            z: 0.0,
            offset_x: 2.0,
            offset_y: 0.0,
            half_width: 4.0,
            half_height: 1.0,
            tile: TileKey { x: 0, y: 0, z: 1 },
            tile_size: 256,
            priority: 0.0,
            slope,
        }
    }

    #[test]
    fn test_bounds_with_offset() {
        assert_eq!(request(None).bounds(), [8.0, 9.0, 16.0, 11.0]);
    }

    #[test]
    fn test_world_bounds_shift_by_tile() {
        let mut r = request(None);
        r.tile = TileKey { x: 1, y: 2, z: 2 };
        assert_eq!(r.world_bounds(), [264.0, 521.0, 272.0, 523.0]);
    }

    #[test]
    fn test_rotated_bounds_swap_extents() {
        let b = request(Some(std::f32::consts::FRAC_PI_2)).bounds();
        assert!((b[2] - b[0] - 2.0).abs() < 1e-4);
        assert!((b[3] - b[1] - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_accept_all_assigns_ids() {
        let mut arbiter = AcceptAll::default();
        let a = arbiter.insert(&request(None)).unwrap();
        let b = arbiter.insert(&request(None)).unwrap();
        assert_ne!(a.id, b.id);
    }
}
