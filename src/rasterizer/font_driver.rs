//! Glyph rasterization primitives supplied by the embedding environment.
//!
//! This module defines the `FontDriver` trait, the injected capability the
//! glyph cache renders through. The core never locates a font service on its
//! own; the host hands a driver to `DrawContext::init`.

use anyhow::Result;

/// Horizontal layout metrics of one glyph, in whole pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlyphMetrics {
    /// Pen advance to the next glyph origin.
    pub advance_x: i32,
    /// Offset from the pen position to the bitmap's left edge.
    pub bearing_x: i32,
    /// Distance from the baseline up to the bitmap's top edge.
    pub bearing_y: i32,
}

/// Vertical layout of the configured font.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineLayout {
    /// Distance between consecutive baselines.
    pub line_height: i32,
    /// Distance from the top of a line to its baseline.
    pub baseline: i32,
}

/// A rendered glyph as produced by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterizedGlyph {
    pub width: u32,
    pub height: u32,
    /// One 8-bit coverage value per pixel, row-major, `width * height` bytes.
    pub coverage: Vec<u8>,
    pub metrics: GlyphMetrics,
}

/// Font family variants offered by the host font service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Original,
    Rounded,
    Pop,
    Cyrillic,
    /// Used for any setting the host does not recognise.
    Fallback,
}

impl FontStyle {
    /// Resolve the user's style setting, letting the system language
    /// override it where the other families lack the needed script.
    pub fn select(user_setting: u32, system_language: u32) -> Self {
        let setting = match system_language {
            9..=11 | 16 | 19 => 0,
            7 => 4,
            8 => 9,
            _ => user_setting,
        };
        match setting {
            0 => FontStyle::Original,
            1 => FontStyle::Rounded,
            3 => FontStyle::Pop,
            4 => FontStyle::Cyrillic,
            _ => FontStyle::Fallback,
        }
    }
}

/// Platform glyph rasterizer.
///
/// Implementors wrap the host's native font service:
/// - opening a font family
/// - scaling it to a pixel size and stroke weight
/// - reporting line metrics
/// - rasterizing a code point to 8-bit coverage
pub trait FontDriver {
    /// Platform-specific font instance.
    type Font;

    /// Open a font instance for the given family.
    ///
    /// # Returns
    /// The font handle, or an error when the font service is unavailable.
    fn open_font(&self, style: FontStyle) -> Result<Self::Font>;

    /// Scale the font to `width x height` pixels with the given weight.
    fn set_scale(&self, font: &mut Self::Font, width: f32, height: f32, weight: f32);

    /// Line metrics for the font at its current scale.
    fn line_layout(&self, font: &Self::Font) -> LineLayout;

    /// Rasterize one code point.
    ///
    /// # Returns
    /// Coverage bytes plus metrics, or `None` if the font cannot render it.
    /// The bitmap should not exceed the scaled font size; the cache crops
    /// anything larger than its 32x32 cell.
    fn rasterize_glyph(&self, font: &Self::Font, code: u32) -> Option<RasterizedGlyph>;
}
