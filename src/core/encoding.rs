//! Fixed-point encodings shared with the renderer.
//!
//! Point and text anchors are stored as `i16` pairs:
//!
//! ```text
//!  15                              1   0
//! +---------------------------------+---+
//! |  round(px * 8), two's complement | v |
//! +---------------------------------+---+
//! ```
//!
//! giving 1/8 px precision over ±2047 px with a visibility flag `v` in the
//! low bit. Label rotation is quantized to 10 bits (1024 steps per turn) and
//! packed below the horizontal texture coordinate: `u << 10 | rotation`.

use std::f32::consts::TAU;

/// Sub-pixel steps per pixel.
pub const POINT_SUBPIXELS: f32 = 8.0;
/// Largest encodable magnitude in pixels.
pub const POINT_RANGE: f32 = 2047.0;

pub const ROTATION_BITS: u32 = 10;
pub const ROTATION_STEPS: u32 = 1 << ROTATION_BITS;
const ROTATION_MASK: u32 = ROTATION_STEPS - 1;

/// Largest texture coordinate that fits above the rotation bits.
pub const MAX_TEXCOORD: u32 = u32::MAX >> ROTATION_BITS;

/// Encode a tile-local pixel coordinate with its visibility flag.
/// Values beyond ±2047 px are clamped.
pub fn encode_point(px: f32, visible: bool) -> i16 {
    let fixed = (px.clamp(-POINT_RANGE, POINT_RANGE) * POINT_SUBPIXELS).round() as i16;
    (fixed << 1) | visible as i16
}

/// Inverse of [`encode_point`].
pub fn decode_point(encoded: i16) -> (f32, bool) {
    let visible = encoded & 1 == 1;
    ((encoded >> 1) as f32 / POINT_SUBPIXELS, visible)
}

pub fn encode_position(px: [f32; 2], visible: bool) -> [i16; 2] {
    [encode_point(px[0], visible), encode_point(px[1], visible)]
}

/// Quantize an angle in radians to `0..1024`.
pub fn quantize_rotation(radians: f32) -> u16 {
    let turns = (radians / TAU).rem_euclid(1.0);
    ((turns * ROTATION_STEPS as f32).round() as u32 & ROTATION_MASK) as u16
}

pub fn dequantize_rotation(steps: u16) -> f32 {
    (steps as u32 & ROTATION_MASK) as f32 / ROTATION_STEPS as f32 * TAU
}

/// Pack a texture coordinate with a quantized rotation.
pub fn pack_texcoord(u: u32, rotation: u16) -> u32 {
    (u.min(MAX_TEXCOORD) << ROTATION_BITS) | (rotation as u32 & ROTATION_MASK)
}

pub fn unpack_texcoord(packed: u32) -> (u32, u16) {
    (packed >> ROTATION_BITS, (packed & ROTATION_MASK) as u16)
}
