//! Tile compilation: the primitive group factory, the incremental compile
//! task that drives it and finalization into GPU-ready groups.

pub mod factory;
pub mod finalize;
pub mod scheduler;
pub mod stats;

pub use factory::{
    CompileContext, Emit, PrimitiveGroupFactory, SkipReason, DEFAULT_COLLISION_GROUP,
    DEFAULT_FONT, DEFAULT_FONT_SIZE,
};
pub use finalize::{finalize, CompiledGroup, CompiledTile, RenderState, SharedTexture};
pub use scheduler::{CompileState, CompileTask, StepOutcome, StyleSource};
pub use stats::CompileStats;
