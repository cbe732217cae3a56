//! Append-only texture atlases shared by all tiles of a session.
//!
//! Regions are never moved or freed once allocated, so texture coordinates
//! stored in compiled buffers stay valid for the session's lifetime.

use std::collections::BTreeMap;

/// Allocated atlas region in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtlasRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Row-based packer with a fixed width and growing height.
#[derive(Debug, Clone)]
pub struct ShelfPacker {
    width: u32,
    height: u32,
    shelf_y: u32,
    shelf_height: u32,
    cursor_x: u32,
    padding: u32,
}

impl ShelfPacker {
    pub fn new(width: u32, padding: u32) -> Self {
        Self {
            width,
            height: 0,
            shelf_y: 0,
            shelf_height: 0,
            cursor_x: 0,
            padding,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in use, including the open shelf.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Allocate a region, opening a new shelf when the current one is full.
    /// Returns `None` when the region is wider than the atlas.
    pub fn allocate(&mut self, width: u32, height: u32) -> Option<AtlasRegion> {
        let padded_w = width + self.padding;
        if padded_w > self.width {
            return None;
        }
        if self.cursor_x + padded_w > self.width {
            self.shelf_y += self.shelf_height;
            self.shelf_height = 0;
            self.cursor_x = 0;
        }
        let region = AtlasRegion {
            x: self.cursor_x,
            y: self.shelf_y,
            width,
            height,
        };
        self.cursor_x += padded_w;
        self.shelf_height = self.shelf_height.max(height + self.padding);
        self.height = self.height.max(self.shelf_y + self.shelf_height);
        Some(region)
    }
}

/// RGBA8 image atlas for icons and dash images.
#[derive(Debug, Clone)]
pub struct ImageAtlas {
    packer: ShelfPacker,
    pixels: Vec<u8>,
    regions: BTreeMap<String, AtlasRegion>,
}

impl ImageAtlas {
    pub const WIDTH: u32 = 1024;

    pub fn new() -> Self {
        Self {
            packer: ShelfPacker::new(Self::WIDTH, 1),
            pixels: Vec::new(),
            regions: BTreeMap::new(),
        }
    }

    pub fn region(&self, name: &str) -> Option<AtlasRegion> {
        self.regions.get(name).copied()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.packer.width(), self.packer.height())
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy an RGBA8 image into the atlas. Re-inserting a name returns the
    /// existing region. `None` when the image is too wide or the pixel buffer
    /// does not match its size.
    pub fn insert(&mut self, name: &str, width: u32, height: u32, rgba: &[u8]) -> Option<AtlasRegion> {
        if let Some(region) = self.region(name) {
            return Some(region);
        }
        if rgba.len() != (width * height * 4) as usize {
            return None;
        }
        let region = self.packer.allocate(width, height)?;
        let stride = (Self::WIDTH * 4) as usize;
        self.pixels.resize(stride * self.packer.height() as usize, 0);
        for row in 0..height as usize {
            let src = &rgba[row * width as usize * 4..(row + 1) * width as usize * 4];
            let dst = (region.y as usize + row) * stride + region.x as usize * 4;
            self.pixels[dst..dst + src.len()].copy_from_slice(src);
        }
        self.regions.insert(name.to_string(), region);
        Some(region)
    }
}

impl Default for ImageAtlas {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference to one rasterized dash pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashRef {
    pub row: u32,
    /// Pattern length in pixels; one texture row spans one pattern.
    pub length: f32,
}

/// Single-channel dash texture, one row per distinct pattern.
#[derive(Debug, Clone)]
pub struct DashAtlas {
    rows: Vec<Vec<u8>>,
    patterns: BTreeMap<String, DashRef>,
}

impl DashAtlas {
    pub const WIDTH: u32 = 256;

    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            patterns: BTreeMap::new(),
        }
    }

    /// Row for `pattern` (alternating dash/gap lengths), rasterizing it on
    /// first use. `None` for empty or zero-length patterns.
    pub fn get_or_insert(&mut self, pattern: &[f32]) -> Option<DashRef> {
        let length: f32 = pattern.iter().sum();
        if pattern.is_empty() || length <= 0.0 {
            return None;
        }
        let key = pattern_key(pattern);
        if let Some(dash) = self.patterns.get(&key) {
            return Some(*dash);
        }

        let mut row = vec![0u8; Self::WIDTH as usize];
        for (texel, value) in row.iter_mut().enumerate() {
            let along = (texel as f32 + 0.5) / Self::WIDTH as f32 * length;
            let mut acc = 0.0;
            for (i, segment) in pattern.iter().enumerate() {
                acc += segment;
                if along < acc {
                    *value = if i % 2 == 0 { 255 } else { 0 };
                    break;
                }
            }
        }

        let dash = DashRef {
            row: self.rows.len() as u32,
            length,
        };
        self.rows.push(row);
        self.patterns.insert(key, dash);
        Some(dash)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: u32) -> Option<&[u8]> {
        self.rows.get(index as usize).map(Vec::as_slice)
    }
}

impl Default for DashAtlas {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical pattern key, e.g. `"4,2"`.
pub fn pattern_key(pattern: &[f32]) -> String {
    pattern
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
