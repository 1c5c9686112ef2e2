//! Bounded glyph cache over a fixed atlas.
//!
//! The `GlyphCache` maps a code point to its rendered coverage bitmap and
//! metrics, using a `FontDriver` for rendering. Storage is allocated once:
//! `capacity` slots, each owning one 32x32 byte atlas cell.
//!
//! Eviction is generational, not LRU. When a miss finds every slot in use the
//! whole cache is discarded and filling restarts at slot 0.

use super::font_driver::{FontDriver, FontStyle, GlyphMetrics, LineLayout};
use crate::config::FontConfig;
use anyhow::{Context, Result};
use log::*;

/// Default number of glyph slots.
pub const FONT_CACHE_MAX: usize = 64;

/// Edge length of an atlas cell; glyph size is clamped to it.
pub const ATLAS_CELL: u32 = 32;

const CELL_BYTES: usize = (ATLAS_CELL * ATLAS_CELL) as usize;

/// One cache slot: a rendered glyph and its atlas cell.
#[derive(Clone)]
pub struct Glyph {
    pub code: u32,
    pub width: u32,
    pub height: u32,
    pub metrics: GlyphMetrics,
    image: Box<[u8; CELL_BYTES]>,
}

impl Glyph {
    fn empty() -> Self {
        Self {
            code: 0,
            width: 0,
            height: 0,
            metrics: GlyphMetrics::default(),
            image: Box::new([0; CELL_BYTES]),
        }
    }

    /// Coverage bytes, `width * height`, row-major.
    pub fn coverage(&self) -> &[u8] {
        &self.image[..(self.width * self.height) as usize]
    }
}

impl std::fmt::Debug for Glyph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Glyph")
            .field("code", &self.code)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Glyph cache bound to one open font.
pub struct GlyphCache<D: FontDriver> {
    driver: D,
    font: D::Font,
    slots: Box<[Glyph]>,
    /// Slots `[0, count)` hold valid, distinct glyphs.
    count: usize,
    font_width: f32,
    font_height: f32,
    weight: f32,
    spacing: i32,
    layout: LineLayout,
}

impl<D: FontDriver> GlyphCache<D> {
    /// Open `style` through `driver` and configure it from `font`.
    ///
    /// # Returns
    /// The cache, or an error if the driver cannot open the font.
    pub fn new(driver: D, style: FontStyle, font: &FontConfig) -> Result<Self> {
        Self::with_capacity(driver, style, font, FONT_CACHE_MAX)
    }

    pub fn with_capacity(
        driver: D,
        style: FontStyle,
        font: &FontConfig,
        capacity: usize,
    ) -> Result<Self> {
        let capacity = capacity.max(1);
        let handle = driver
            .open_font(style)
            .with_context(|| format!("Failed to open {:?} font", style))?;

        info!(
            "GlyphCache: Opened {:?} font, {} slots of {}x{}",
            style, capacity, ATLAS_CELL, ATLAS_CELL
        );

        let mut cache = Self {
            driver,
            font: handle,
            slots: vec![Glyph::empty(); capacity].into_boxed_slice(),
            count: 0,
            font_width: 0.0,
            font_height: 0.0,
            weight: 0.0,
            spacing: 0,
            layout: LineLayout::default(),
        };
        cache.configure(font.width, font.height, font.weight, font.spacing);
        Ok(cache)
    }

    /// Rescale the font and drop every cached glyph.
    ///
    /// Width and height are clamped to the atlas cell size.
    pub fn configure(&mut self, font_width: f32, font_height: f32, weight: f32, spacing: i32) {
        let cell = ATLAS_CELL as f32;
        let font_width = font_width.min(cell);
        let font_height = font_height.min(cell);

        self.driver
            .set_scale(&mut self.font, font_width, font_height, weight);
        self.layout = self.driver.line_layout(&self.font);

        self.count = 0;
        self.font_width = font_width;
        self.font_height = font_height;
        self.weight = weight;
        self.spacing = spacing;

        debug!(
            "GlyphCache: Configured {}x{} weight {} spacing {}, line height {}",
            font_width, font_height, weight, spacing, self.layout.line_height
        );
    }

    /// Return the cached glyph for `code`, rendering it on a miss.
    pub fn lookup_or_render(&mut self, code: u32) -> &Glyph {
        if let Some(idx) = self.slots[..self.count].iter().position(|g| g.code == code) {
            trace!("GlyphCache: Hit for U+{:04X} in slot {}", code, idx);
            return &self.slots[idx];
        }

        let mut next = self.count;
        if next >= self.slots.len() {
            debug!(
                "GlyphCache: Full at {} glyphs, resetting",
                self.slots.len()
            );
            self.count = 0;
            next = 0;
        }

        self.render_into(next, code);
        self.count += 1;
        &self.slots[next]
    }

    fn render_into(&mut self, idx: usize, code: u32) {
        let slot = &mut self.slots[idx];
        slot.code = code;

        let Some(rendered) = self.driver.rasterize_glyph(&self.font, code) else {
            warn!("GlyphCache: Font cannot render U+{:04X}", code);
            slot.width = 0;
            slot.height = 0;
            slot.metrics = GlyphMetrics::default();
            return;
        };

        let width = rendered.width.min(ATLAS_CELL);
        let height = rendered.height.min(ATLAS_CELL);
        if width != rendered.width || height != rendered.height {
            warn!(
                "GlyphCache: U+{:04X} rendered at {}x{}, cropping to {}x{}",
                code, rendered.width, rendered.height, width, height
            );
        }

        // Rows are re-packed at the cropped width.
        let src_stride = rendered.width as usize;
        for row in 0..height as usize {
            let src_start = row * src_stride;
            let dst_start = row * width as usize;
            let len = (width as usize).min(rendered.coverage.len().saturating_sub(src_start));
            slot.image[dst_start..dst_start + len]
                .copy_from_slice(&rendered.coverage[src_start..src_start + len]);
            slot.image[dst_start + len..dst_start + width as usize].fill(0);
        }

        slot.width = width;
        slot.height = height;
        slot.metrics = rendered.metrics;
        debug!(
            "GlyphCache: Rendered U+{:04X} into slot {} ({}x{})",
            code, idx, width, height
        );
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The glyph in `idx`, if that slot is currently valid.
    pub fn slot(&self, idx: usize) -> Option<&Glyph> {
        self.slots[..self.count].get(idx)
    }

    pub fn spacing(&self) -> i32 {
        self.spacing
    }

    /// Change inter-glyph spacing. Cached bitmaps stay valid.
    pub fn set_spacing(&mut self, spacing: i32) {
        self.spacing = spacing;
    }

    pub fn layout(&self) -> LineLayout {
        self.layout
    }

    pub fn line_height(&self) -> i32 {
        self.layout.line_height
    }

    /// Current `(width, height, weight)`.
    pub fn font_size(&self) -> (f32, f32, f32) {
        (self.font_width, self.font_height, self.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::font_driver::RasterizedGlyph;
    use crate::rasterizer::headless_font_driver::HeadlessFontDriver;
    use std::cell::Cell;
    use test_log::test;

    fn font(width: f32, height: f32) -> FontConfig {
        FontConfig {
            width,
            height,
            ..FontConfig::default()
        }
    }

    /// Counts rasterize calls and renders oversized bitmaps on request.
    struct CountingDriver {
        renders: Cell<usize>,
        size: u32,
    }

    impl FontDriver for CountingDriver {
        type Font = ();

        fn open_font(&self, _style: FontStyle) -> Result<()> {
            Ok(())
        }

        fn set_scale(&self, _font: &mut (), _w: f32, _h: f32, _weight: f32) {}

        fn line_layout(&self, _font: &()) -> LineLayout {
            LineLayout {
                line_height: 10,
                baseline: 8,
            }
        }

        fn rasterize_glyph(&self, _font: &(), code: u32) -> Option<RasterizedGlyph> {
            self.renders.set(self.renders.get() + 1);
            let size = self.size;
            Some(RasterizedGlyph {
                width: size,
                height: size,
                coverage: (0..size * size).map(|i| (i % 251) as u8 + 1).collect(),
                metrics: GlyphMetrics {
                    advance_x: code as i32,
                    bearing_x: 0,
                    bearing_y: size as i32,
                },
            })
        }
    }

    struct FailingDriver;

    impl FontDriver for FailingDriver {
        type Font = ();

        fn open_font(&self, _style: FontStyle) -> Result<()> {
            anyhow::bail!("font service not found")
        }

        fn set_scale(&self, _font: &mut (), _w: f32, _h: f32, _weight: f32) {}

        fn line_layout(&self, _font: &()) -> LineLayout {
            LineLayout::default()
        }

        fn rasterize_glyph(&self, _font: &(), _code: u32) -> Option<RasterizedGlyph> {
            None
        }
    }

    #[test]
    fn test_configure_clamps_to_atlas_cell() {
        let mut cache =
            GlyphCache::new(HeadlessFontDriver::new(), FontStyle::Original, &font(48.0, 40.0))
                .unwrap();
        assert_eq!(cache.font_size().0, 32.0);
        assert_eq!(cache.font_size().1, 32.0);

        let glyph = cache.lookup_or_render('W' as u32);
        assert_eq!((glyph.width, glyph.height), (32, 32));
    }

    #[test]
    fn test_hit_does_not_render_again() {
        let driver = CountingDriver {
            renders: Cell::new(0),
            size: 4,
        };
        let mut cache =
            GlyphCache::with_capacity(driver, FontStyle::Original, &font(4.0, 4.0), 8).unwrap();

        cache.lookup_or_render('a' as u32);
        cache.lookup_or_render('b' as u32);
        cache.lookup_or_render('a' as u32);
        assert_eq!(cache.count(), 2);
        assert_eq!(cache.driver.renders.get(), 2);
    }

    #[test]
    fn test_full_cache_resets_to_newest_in_slot_zero() {
        // Contract: after exactly `capacity` distinct insertions the next
        // distinct insertion resets the cache; count becomes 1 and slot 0
        // holds the newest glyph.
        let capacity = 5;
        let mut cache = GlyphCache::with_capacity(
            HeadlessFontDriver::new(),
            FontStyle::Original,
            &font(8.0, 8.0),
            capacity,
        )
        .unwrap();

        for code in 0..capacity as u32 {
            cache.lookup_or_render('a' as u32 + code);
            assert!(cache.count() <= cache.capacity());
        }
        assert_eq!(cache.count(), capacity);

        let glyph = cache.lookup_or_render('z' as u32);
        assert_eq!(glyph.code, 'z' as u32);
        assert_eq!(cache.count(), 1);
        assert_eq!(cache.slot(0).unwrap().code, 'z' as u32);
        assert!(cache.slot(1).is_none());
    }

    #[test]
    fn test_cached_codes_are_unique() {
        let mut cache = GlyphCache::with_capacity(
            HeadlessFontDriver::new(),
            FontStyle::Original,
            &font(8.0, 8.0),
            6,
        )
        .unwrap();
        for ch in "abcabcdefgabc".chars() {
            cache.lookup_or_render(ch as u32);
        }
        let codes: Vec<u32> = (0..cache.count())
            .map(|i| cache.slot(i).unwrap().code)
            .collect();
        let mut deduped = codes.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(codes.len(), deduped.len());
    }

    #[test]
    fn test_configure_invalidates_entries() {
        let mut cache =
            GlyphCache::new(HeadlessFontDriver::new(), FontStyle::Original, &font(8.0, 8.0))
                .unwrap();
        cache.lookup_or_render('a' as u32);
        assert_eq!(cache.count(), 1);

        cache.configure(16.0, 16.0, 1.0, 2);
        assert_eq!(cache.count(), 0);
        assert_eq!(cache.spacing(), 2);
        assert_eq!(cache.line_height(), 20);
        assert_eq!(cache.lookup_or_render('a' as u32).width, 16);
    }

    #[test]
    fn test_oversized_bitmap_is_cropped_to_cell() {
        let driver = CountingDriver {
            renders: Cell::new(0),
            size: 40,
        };
        let mut cache =
            GlyphCache::with_capacity(driver, FontStyle::Original, &font(32.0, 32.0), 4).unwrap();

        let glyph = cache.lookup_or_render('M' as u32);
        assert_eq!((glyph.width, glyph.height), (32, 32));
        assert_eq!(glyph.coverage().len(), 32 * 32);
        // Second row starts at source offset 40, not 32.
        assert_eq!(glyph.coverage()[32], (40 % 251) as u8 + 1);
    }

    #[test]
    fn test_open_failure_is_an_error() {
        let result = GlyphCache::new(FailingDriver, FontStyle::Original, &font(8.0, 8.0));
        let err = result.err().unwrap();
        assert!(format!("{:#}", err).contains("font service not found"));
    }
}
