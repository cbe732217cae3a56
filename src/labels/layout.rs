//! Text shaping: word wrapping and anchor alignment of glyph quads.

use crate::core::atlas::AtlasRegion;
use crate::labels::atlas::GlyphAtlas;
use glam::Vec2;

/// Where the anchor point sits relative to the text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextAnchor {
    #[default]
    Center,
    Left,
    Right,
    Top,
    Bottom,
}

impl TextAnchor {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "center" | "middle" => Some(TextAnchor::Center),
            "left" | "start" => Some(TextAnchor::Left),
            "right" | "end" => Some(TextAnchor::Right),
            "top" => Some(TextAnchor::Top),
            "bottom" => Some(TextAnchor::Bottom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextAnchor::Center => "center",
            TextAnchor::Left => "left",
            TextAnchor::Right => "right",
            TextAnchor::Top => "top",
            TextAnchor::Bottom => "bottom",
        }
    }
}

/// One glyph quad, in pixels relative to the anchor (y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    pub min: Vec2,
    pub max: Vec2,
    pub region: AtlasRegion,
}

/// Shaped text block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub quads: Vec<GlyphQuad>,
    pub lines: usize,
    /// Block bounds relative to the anchor: `[x0, y0, x1, y1]`.
    pub bounds: [f32; 4],
}

impl TextLayout {
    pub fn width(&self) -> f32 {
        self.bounds[2] - self.bounds[0]
    }

    pub fn height(&self) -> f32 {
        self.bounds[3] - self.bounds[1]
    }
}

/// Text layout parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle<'a> {
    pub font: &'a str,
    pub size: f32,
    /// Maximum line width in pixels; `None` keeps a single line.
    pub wrap_width: Option<f32>,
    pub anchor: TextAnchor,
}

/// Shape `text`. Returns `None` when no glyph could be produced.
pub fn layout_text(atlas: &mut GlyphAtlas, text: &str, style: &TextStyle<'_>) -> Option<TextLayout> {
    let scale = style.size / GlyphAtlas::BASE_SIZE;
    let line_height = style.size * GlyphAtlas::LINE_HEIGHT;

    let lines = wrap_lines(atlas, text, style.font, scale, style.wrap_width);
    let widths: Vec<f32> = lines
        .iter()
        .map(|line| measure(atlas, line, style.font, scale))
        .collect();
    let block_width = widths.iter().copied().fold(0.0f32, f32::max);
    let block_height = line_height * lines.len() as f32;
    if block_width <= 0.0 {
        return None;
    }

    let (x0, y0) = match style.anchor {
        TextAnchor::Center => (-block_width * 0.5, -block_height * 0.5),
        TextAnchor::Left => (0.0, -block_height * 0.5),
        TextAnchor::Right => (-block_width, -block_height * 0.5),
        TextAnchor::Top => (-block_width * 0.5, 0.0),
        TextAnchor::Bottom => (-block_width * 0.5, -block_height),
    };

    let mut quads = Vec::new();
    for (row, (line, width)) in lines.iter().zip(&widths).enumerate() {
        let mut cursor = match style.anchor {
            TextAnchor::Left => x0,
            TextAnchor::Right => x0 + block_width - width,
            _ => x0 + (block_width - width) * 0.5,
        };
        let top = y0 + row as f32 * line_height + (line_height - style.size) * 0.5;
        for ch in line.chars() {
            let Some(glyph) = atlas.glyph(style.font, ch) else {
                continue;
            };
            if glyph.region.width > 0 && glyph.region.height > 0 {
                let min = Vec2::new(
                    cursor + glyph.offset_x * scale,
                    top + glyph.offset_y * scale,
                );
                let size = Vec2::new(glyph.region.width as f32, glyph.region.height as f32) * scale;
                quads.push(GlyphQuad {
                    min,
                    max: min + size,
                    region: glyph.region,
                });
            }
            cursor += glyph.advance * scale;
        }
    }

    if quads.is_empty() {
        return None;
    }
    Some(TextLayout {
        quads,
        lines: lines.len(),
        bounds: [x0, y0, x0 + block_width, y0 + block_height],
    })
}

fn measure(atlas: &mut GlyphAtlas, text: &str, font: &str, scale: f32) -> f32 {
    text.chars()
        .filter_map(|ch| atlas.glyph(font, ch))
        .map(|g| g.advance * scale)
        .sum()
}

/// Greedy word wrap. Words longer than the wrap width get a line of their own.
fn wrap_lines(
    atlas: &mut GlyphAtlas,
    text: &str,
    font: &str,
    scale: f32,
    wrap_width: Option<f32>,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let Some(max_width) = wrap_width.filter(|w| *w > 0.0) else {
            lines.push(paragraph.trim().to_string());
            continue;
        };
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measure(atlas, &candidate, font, scale) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }
    lines.retain(|l| !l.is_empty());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(wrap_width: Option<f32>, anchor: TextAnchor) -> TextStyle<'static> {
        TextStyle {
            font: "sans",
            size: 24.0,
            wrap_width,
            anchor,
        }
    }

    #[test]
    fn test_single_line_is_centered() {
        let mut atlas = GlyphAtlas::default();
        let layout = layout_text(&mut atlas, "abc", &style(None, TextAnchor::Center)).unwrap();
        assert_eq!(layout.quads.len(), 3);
        assert_eq!(layout.lines, 1);
        assert!((layout.bounds[0] + layout.bounds[2]).abs() < 1e-4);
        assert!((layout.width() - 3.0 * 24.0 * 0.6).abs() < 1e-3);
    }

    #[test]
    fn test_line_wrap_splits_words() {
        let mut atlas = GlyphAtlas::default();
        // "aaa bbb" is 7 advances of 14.4px; wrap at 60px forces two lines.
        let layout = layout_text(&mut atlas, "aaa bbb", &style(Some(60.0), TextAnchor::Center)).unwrap();
        assert_eq!(layout.lines, 2);
        assert_eq!(layout.quads.len(), 6);
        assert!(layout.height() > 24.0 * 2.0);
    }

    #[test]
    fn test_left_anchor_starts_at_origin() {
        let mut atlas = GlyphAtlas::default();
        let layout = layout_text(&mut atlas, "ab", &style(None, TextAnchor::Left)).unwrap();
        assert_eq!(layout.bounds[0], 0.0);
        assert_eq!(layout.quads[0].min.x, 0.0);
        assert_eq!(TextAnchor::parse("RIGHT"), Some(TextAnchor::Right));
    }

    #[test]
    fn test_blank_text_has_no_layout() {
        let mut atlas = GlyphAtlas::default();
        assert!(layout_text(&mut atlas, "   ", &style(None, TextAnchor::Center)).is_none());
    }
}
