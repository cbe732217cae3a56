//! Tiles, features and their geometry.
//!
//! A [`Tile`] projects geographic coordinates (lon, lat, altitude in meters)
//! into tile-local pixel space. [`Feature`]s carry geometry and a property
//! bag and are never mutated during a compile pass; the only interior state is
//! the triangulation cache on [`Polygon`].

pub mod feature;
pub mod tile;

pub use feature::{Coordinates, Feature, FeatureId, Geometry, GeometryType, Polygon};
pub use tile::{Tile, TileKey, EARTH_CIRCUMFERENCE};
