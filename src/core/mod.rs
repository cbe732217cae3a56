//! Session-wide state and GPU data encodings.

pub mod atlas;
pub mod encoding;
pub mod resource;
pub mod session;

pub use atlas::{AtlasRegion, DashAtlas, DashRef, ImageAtlas, ShelfPacker};
pub use encoding::{
    decode_point, encode_point, encode_position, pack_texcoord, quantize_rotation, unpack_texcoord,
};
pub use resource::{ResourceHandle, ResourceKind, ResourceRequest, ResourceStatus, ResourceTracker};
pub use session::{ModelInfo, ModelRef, ModelRegistry, RenderSession};
