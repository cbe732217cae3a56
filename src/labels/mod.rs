//! Label support: glyph atlas and text shaping, collision arbitration,
//! deferred collision candidates and repeat-distance groups.

pub mod atlas;
pub mod candidate;
pub mod collision;
pub mod distance;
pub mod layout;
pub mod rtree;

pub use atlas::{FixedAdvanceRasterizer, GlyphAtlas, GlyphMetrics, GlyphRasterizer, RasterizedGlyph};
pub use candidate::{CandidateSet, CollisionCandidate, Contribution, PartRef};
pub use collision::{AcceptAll, CollisionArbiter, CollisionRequest, PlacementRecord};
pub use distance::DistanceGroups;
pub use layout::{layout_text, GlyphQuad, TextAnchor, TextLayout, TextStyle};
pub use rtree::RTreeArbiter;
