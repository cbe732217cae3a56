//! vtforge: incremental feature-to-primitive compiler for styled vector map tiles.
//!
//! Features of one tile are resolved against their style declarations and
//! compiled into batched draw groups (vertex and index buffers plus uniform
//! state). Labels take part in a two-phase collision protocol, and the whole
//! pass runs as a [`CompileTask`] that yields back to the host after every
//! bundle of work.
//!
//! No GPU device is created here; compiled groups carry plain byte buffers
//! and `wgpu` descriptor values for the renderer.

pub mod config;
pub mod core;
pub mod error;
pub mod geo;
pub mod labels;
pub mod pipeline;
pub mod style;
pub mod vector;

pub use crate::config::{CompileConfig, ConfigError};
pub use crate::core::{ModelInfo, RenderSession, ResourceHandle, ResourceKind, ResourceStatus};
pub use crate::error::{CompileError, CompileResult};
pub use crate::geo::{Coordinates, Feature, FeatureId, Geometry, GeometryType, Polygon, Tile, TileKey};
pub use crate::labels::{AcceptAll, CollisionArbiter, CollisionRequest, PlacementRecord, RTreeArbiter};
pub use crate::pipeline::{
    CompileState, CompileStats, CompileTask, CompiledGroup, CompiledTile, Emit, PrimitiveGroupFactory,
    RenderState, SkipReason, StepOutcome, StyleSource,
};
pub use crate::style::{PrimitiveKind, StyleDeclaration, StyleGroup, StyleValueResolver};
pub use crate::vector::{DrawGroup, GroupUniforms, LineGeometryProcessor};
