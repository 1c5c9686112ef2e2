//! Headless font driver implementation.
//!
//! Renders every printable code point as a solid block the size of the
//! configured font, so layout and compositing can run without a host font
//! service (tests, the demo binary, off-device previews).

use crate::rasterizer::font_driver::{
    FontDriver, FontStyle, GlyphMetrics, LineLayout, RasterizedGlyph,
};
use anyhow::Result;

/// Extra pixels between lines on top of the glyph height.
const LINE_GAP: i32 = 4;

#[derive(Debug, Clone)]
pub struct HeadlessFont {
    pub style: FontStyle,
    pub width: u32,
    pub height: u32,
    pub weight: f32,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessFontDriver;

impl HeadlessFontDriver {
    pub fn new() -> Self {
        Self
    }
}

impl FontDriver for HeadlessFontDriver {
    type Font = HeadlessFont;

    fn open_font(&self, style: FontStyle) -> Result<Self::Font> {
        Ok(HeadlessFont {
            style,
            width: 0,
            height: 0,
            weight: 1.0,
        })
    }

    fn set_scale(&self, font: &mut Self::Font, width: f32, height: f32, weight: f32) {
        font.width = width.max(0.0).round() as u32;
        font.height = height.max(0.0).round() as u32;
        font.weight = weight;
    }

    fn line_layout(&self, font: &Self::Font) -> LineLayout {
        LineLayout {
            line_height: font.height as i32 + LINE_GAP,
            baseline: font.height as i32,
        }
    }

    fn rasterize_glyph(&self, font: &Self::Font, code: u32) -> Option<RasterizedGlyph> {
        let (width, height) = match code {
            0 => return None,
            // Space and control codes advance without ink.
            c if c <= 0x20 || c == 0x7F => (0, 0),
            _ => (font.width, font.height),
        };
        let advance_x = match code {
            0x20 => font.width as i32 / 2,
            c if c < 0x20 || c == 0x7F => 0,
            _ => font.width as i32,
        };

        Some(RasterizedGlyph {
            width,
            height,
            coverage: vec![0xFF; (width * height) as usize],
            metrics: GlyphMetrics {
                advance_x,
                bearing_x: 0,
                bearing_y: height as i32,
            },
        })
    }
}
