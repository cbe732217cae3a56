//! Web-mercator tile addressing and tile-local projection.

use glam::{DVec3, Vec2, Vec3};
use std::f64::consts::PI;
use std::fmt;

/// Equatorial circumference of the earth in meters (WGS84 semi-major axis).
pub const EARTH_CIRCUMFERENCE: f64 = 2.0 * PI * 6_378_137.0;

/// Unique identifier for a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A tile being compiled. Owned by the caller and only read by the pipeline.
#[derive(Debug, Clone)]
pub struct Tile {
    pub key: TileKey,
    /// Edge length in pixels.
    pub size: u32,
    /// Geometry was pre-clipped to the tile bounds by the data source.
    pub clipped: bool,
}

impl Tile {
    pub fn new(x: u32, y: u32, z: u8, size: u32) -> Self {
        Self {
            key: TileKey { x, y, z },
            size,
            clipped: false,
        }
    }

    pub fn with_clipped(mut self, clipped: bool) -> Self {
        self.clipped = clipped;
        self
    }

    /// Integer zoom used to evaluate zoom-dependent style values.
    pub fn grid_zoom(&self) -> u8 {
        self.key.z
    }

    /// Size of the whole world in pixels at this tile's zoom.
    fn world_size(&self) -> f64 {
        self.size as f64 * 2f64.powi(i32::from(self.key.z))
    }

    /// Project (lon, lat) in degrees to tile-local pixels.
    pub fn project(&self, coord: DVec3) -> Vec2 {
        let world = self.world_size();
        let lat = coord.y.clamp(-85.051_128_78, 85.051_128_78).to_radians();
        let wx = (coord.x + 180.0) / 360.0 * world;
        let wy = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * world;
        let ox = self.key.x as f64 * self.size as f64;
        let oy = self.key.y as f64 * self.size as f64;
        Vec2::new((wx - ox) as f32, (wy - oy) as f32)
    }

    /// Project and keep the altitude (meters) in `z`.
    pub fn project_with_altitude(&self, coord: DVec3) -> Vec3 {
        self.project(coord).extend(coord.z as f32)
    }

    /// Inverse of [`Tile::project`], returns (lon, lat).
    pub fn unproject(&self, px: Vec2) -> DVec3 {
        let world = self.world_size();
        let wx = px.x as f64 + self.key.x as f64 * self.size as f64;
        let wy = px.y as f64 + self.key.y as f64 * self.size as f64;
        let lon = wx / world * 360.0 - 180.0;
        let n = PI - 2.0 * PI * wy / world;
        let lat = n.sinh().atan().to_degrees();
        DVec3::new(lon, lat, 0.0)
    }

    /// Inclusive tile bounds test in tile-local pixels.
    pub fn contains(&self, px: Vec2) -> bool {
        let s = self.size as f32;
        px.x >= 0.0 && px.y >= 0.0 && px.x <= s && px.y <= s
    }

    /// True when the point lies on the tile border (within half a pixel).
    pub fn on_border(&self, px: Vec2) -> bool {
        let s = self.size as f32;
        px.x.abs() < 0.5 || px.y.abs() < 0.5 || (px.x - s).abs() < 0.5 || (px.y - s).abs() < 0.5
    }

    /// Ground resolution at the tile center.
    pub fn meters_per_pixel(&self) -> f64 {
        let center = self.unproject(Vec2::splat(self.size as f32 * 0.5));
        center.y.to_radians().cos() * EARTH_CIRCUMFERENCE / self.world_size()
    }

    pub fn pixels_per_meter(&self) -> f64 {
        1.0 / self.meters_per_pixel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_tile_origin() {
        let tile = Tile::new(0, 0, 0, 256);
        let p = tile.project(DVec3::new(-180.0, 85.051_128_78, 0.0));
        assert!(p.x.abs() < 0.01);
        assert!(p.y.abs() < 0.01);

        let center = tile.project(DVec3::ZERO);
        assert!((center.x - 128.0).abs() < 0.01);
        assert!((center.y - 128.0).abs() < 0.01);
    }

    #[test]
    fn test_project_is_tile_local() {
        let tile = Tile::new(1, 1, 1, 256);
        let p = tile.project(DVec3::ZERO);
        assert!(p.x.abs() < 0.01);
        assert!(p.y.abs() < 0.01);
        assert!(tile.contains(p));
        assert!(tile.on_border(p));
    }

    #[test]
    fn test_unproject_round_trip() {
        let tile = Tile::new(4823, 6160, 14, 256);
        let geo = DVec3::new(-74.0, 40.7, 0.0);
        let back = tile.unproject(tile.project(geo));
        assert!((back.x - geo.x).abs() < 1e-4);
        assert!((back.y - geo.y).abs() < 1e-4);
    }

    #[test]
    fn test_meters_per_pixel_halves_per_zoom() {
        let a = Tile::new(0, 0, 1, 256).meters_per_pixel();
        let b = Tile::new(1, 1, 2, 256).meters_per_pixel();
        assert!(a > b);
        assert_eq!(TileKey { x: 1, y: 2, z: 3 }.to_string(), "3/1/2");
    }

    #[test]
    fn test_world_size_at_deep_zoom() {
        assert_eq!(Tile::new(0, 0, 3, 256).world_size(), 2048.0);
        let deep = Tile::new(0, 0, 70, 256);
        assert_eq!(deep.world_size(), 256.0 * 2f64.powi(70));
        assert!(deep.meters_per_pixel() > 0.0);
    }
}
