//! Glyph atlas filled on demand by a rasterizer.
//!
//! Glyph bitmaps are produced by an external [`GlyphRasterizer`]; the atlas
//! only packs them and keeps their metrics. Metrics are in atlas pixels at
//! [`GlyphAtlas::BASE_SIZE`] and are scaled by `font_size / BASE_SIZE` at
//! layout time.

use crate::core::atlas::{AtlasRegion, ShelfPacker};
use std::collections::BTreeMap;

/// Metrics for a single glyph in the atlas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    /// Unicode codepoint.
    pub codepoint: u32,
    /// Texel region in the atlas.
    pub region: AtlasRegion,
    /// Horizontal offset from cursor to glyph origin.
    pub offset_x: f32,
    /// Vertical offset from baseline to glyph top.
    pub offset_y: f32,
    /// Horizontal advance after this glyph.
    pub advance: f32,
}

/// A rasterized glyph as delivered by the rasterizer.
#[derive(Debug, Clone)]
pub struct RasterizedGlyph {
    pub width: u32,
    pub height: u32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub advance: f32,
    /// Single-channel coverage or distance field, `width * height` bytes.
    pub bitmap: Vec<u8>,
}

/// Produces glyph bitmaps at [`GlyphAtlas::BASE_SIZE`].
pub trait GlyphRasterizer {
    /// `None` when the font has no glyph for `ch`.
    fn rasterize(&self, font: &str, ch: char) -> Option<RasterizedGlyph>;
}

/// Rasterizer with a fixed cell and advance for every printable character.
/// Used headless and in tests where glyph shapes do not matter.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvanceRasterizer {
    pub advance: f32,
    pub height: u32,
}

impl Default for FixedAdvanceRasterizer {
    fn default() -> Self {
        Self {
            advance: GlyphAtlas::BASE_SIZE * 0.6,
            height: GlyphAtlas::BASE_SIZE as u32,
        }
    }
}

impl GlyphRasterizer for FixedAdvanceRasterizer {
    fn rasterize(&self, _font: &str, ch: char) -> Option<RasterizedGlyph> {
        if ch.is_control() {
            return None;
        }
        let (width, height) = if ch.is_whitespace() {
            (0, 0)
        } else {
            (self.advance.ceil() as u32, self.height)
        };
        Some(RasterizedGlyph {
            width,
            height,
            offset_x: 0.0,
            offset_y: 0.0,
            advance: self.advance,
            bitmap: vec![255; (width * height) as usize],
        })
    }
}

/// Glyph atlas keyed by (font, codepoint). Append-only.
pub struct GlyphAtlas {
    packer: ShelfPacker,
    pixels: Vec<u8>,
    glyphs: BTreeMap<(String, u32), Option<GlyphMetrics>>,
    rasterizer: Box<dyn GlyphRasterizer + Send>,
}

impl GlyphAtlas {
    /// Font size glyphs are rasterized at.
    pub const BASE_SIZE: f32 = 24.0;
    pub const WIDTH: u32 = 1024;
    /// Line height as a multiple of the font size.
    pub const LINE_HEIGHT: f32 = 1.2;

    pub fn new(rasterizer: Box<dyn GlyphRasterizer + Send>) -> Self {
        Self {
            packer: ShelfPacker::new(Self::WIDTH, 2),
            pixels: Vec::new(),
            glyphs: BTreeMap::new(),
            rasterizer,
        }
    }

    /// Metrics for `ch`, rasterizing it on first use. Missing glyphs are
    /// remembered so the rasterizer is asked only once.
    pub fn glyph(&mut self, font: &str, ch: char) -> Option<GlyphMetrics> {
        let key = (font.to_string(), ch as u32);
        if let Some(cached) = self.glyphs.get(&key) {
            return *cached;
        }
        let metrics = self.rasterize(font, ch);
        self.glyphs.insert(key, metrics);
        metrics
    }

    fn rasterize(&mut self, font: &str, ch: char) -> Option<GlyphMetrics> {
        let glyph = self.rasterizer.rasterize(font, ch)?;
        if glyph.bitmap.len() != (glyph.width * glyph.height) as usize {
            log::warn!("Glyph '{}' of font '{}' has a malformed bitmap", ch, font);
            return None;
        }
        let region = self.packer.allocate(glyph.width, glyph.height)?;
        let stride = Self::WIDTH as usize;
        self.pixels.resize(stride * self.packer.height() as usize, 0);
        for row in 0..glyph.height as usize {
            let src = &glyph.bitmap[row * glyph.width as usize..(row + 1) * glyph.width as usize];
            let dst = (region.y as usize + row) * stride + region.x as usize;
            self.pixels[dst..dst + src.len()].copy_from_slice(src);
        }
        Some(GlyphMetrics {
            codepoint: ch as u32,
            region,
            offset_x: glyph.offset_x,
            offset_y: glyph.offset_y,
            advance: glyph.advance,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.packer.width(), self.packer.height())
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.values().filter(|g| g.is_some()).count()
    }
}

impl Default for GlyphAtlas {
    fn default() -> Self {
        Self::new(Box::new(FixedAdvanceRasterizer::default()))
    }
}

impl std::fmt::Debug for GlyphAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphAtlas")
            .field("size", &self.size())
            .field("glyphs", &self.glyph_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyphs_are_cached() {
        let mut atlas = GlyphAtlas::default();
        let a = atlas.glyph("sans", 'A').unwrap();
        let again = atlas.glyph("sans", 'A').unwrap();
        assert_eq!(a, again);
        assert_eq!(atlas.glyph_count(), 1);

        let b = atlas.glyph("sans", 'B').unwrap();
        assert_ne!(a.region, b.region);
        assert_eq!(atlas.glyph("serif", 'A').map(|g| g.codepoint), Some('A' as u32));
        assert_eq!(atlas.glyph_count(), 3);
    }

    #[test]
    fn test_space_has_advance_but_no_area() {
        let mut atlas = GlyphAtlas::default();
        let space = atlas.glyph("sans", ' ').unwrap();
        assert_eq!(space.region.width, 0);
        assert!(space.advance > 0.0);
        assert!(atlas.glyph("sans", '\n').is_none());
    }
}
