// src/context.rs

//! The draw context: sole owner of every rendering buffer.
//!
//! ```text
//!  text ──► Layer (canvas | strip | side menu) ──publish──► Framebuffer
//!  images ─► slot 0: canvas pixels                          ▲
//!            slots 1..=10: shared scratch ──blit───────────┘
//!  boxes, selection frames, backdrops ─────────────────────┘
//! ```
//!
//! Text is composed offscreen and published; images, boxes and frames are
//! written straight to the framebuffer on top of the last published frame.
//! One context exists per process; it is built by [`DrawContext::init`] and
//! consumed by [`DrawContext::shutdown`].

use std::path::Path;
use std::time::Duration;

use log::*;

use crate::color::SHADOW_GRAY;
use crate::compositor::{self, backdrop_rects, frame_rects};
use crate::config::Config;
use crate::error::{RenderError, Result};
use crate::framebuffer::Framebuffer;
use crate::image::{self, FileDecoder, Image, ImageDecoder, LoadPolicy, CANVAS_SLOT, IMG_MAX};
use crate::pixel_buffer::{PixelBuffer, Surface};
use crate::rasterizer::{FontDriver, FontStyle, GlyphCache, ATLAS_CELL};
use crate::text::{TextAnchor, TextShaper};

/// Display width on which the text shadow is transparent.
const NO_SHADOW_WIDTH: u32 = 1920;

/// Offscreen buffers text can be drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Full-screen canvas; also the pixels of image slot 0.
    Canvas,
    /// Info bar across the canvas width.
    Strip,
    SideMenu,
}

pub struct DrawContext<D: FontDriver, I: ImageDecoder = FileDecoder> {
    config: Config,
    canvas: PixelBuffer,
    strip: PixelBuffer,
    side_menu: PixelBuffer,
    scratch: Vec<u32>,
    /// Slot whose pixels are currently in `scratch`.
    scratch_owner: Option<usize>,
    images: [Option<Image>; IMG_MAX + 1],
    /// `None` when the font could not be opened; text drawing is skipped.
    glyphs: Option<GlyphCache<D>>,
    decoder: I,
    framebuffer: Framebuffer,
    foreground: u32,
    background: u32,
}

impl<D: FontDriver, I: ImageDecoder> DrawContext<D, I> {
    /// Build a context with freshly allocated framebuffer memory.
    pub fn init(config: Config, driver: D, decoder: I) -> Result<Self> {
        let framebuffer = Framebuffer::new(config.display)?;
        Self::init_with_framebuffer(config, framebuffer, driver, decoder)
    }

    /// Build a context around framebuffer memory owned by the host.
    pub fn init_with_framebuffer(
        config: Config,
        framebuffer: Framebuffer,
        driver: D,
        decoder: I,
    ) -> Result<Self> {
        config.validate()?;
        if *framebuffer.display() != config.display {
            return Err(RenderError::InvalidDisplay(format!(
                "framebuffer is {:?}, config expects {:?}",
                framebuffer.display(),
                config.display
            )));
        }

        let style = FontStyle::select(config.font.style_setting, config.font.system_language);
        let glyphs = match GlyphCache::new(driver, style, &config.font) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("DrawContext: Text disabled: {:#}", e);
                None
            }
        };

        let canvas_cfg = &config.canvas;
        let background = config.colors.background;
        let scratch_len = canvas_cfg.image_max_width as usize * canvas_cfg.image_max_height as usize;
        let ctx = Self {
            canvas: PixelBuffer::filled(canvas_cfg.width, canvas_cfg.height, background),
            strip: PixelBuffer::filled(canvas_cfg.width, canvas_cfg.strip_height, background),
            side_menu: PixelBuffer::filled(
                canvas_cfg.side_menu_width,
                canvas_cfg.side_menu_height,
                background,
            ),
            scratch: vec![0; scratch_len],
            scratch_owner: None,
            images: [None; IMG_MAX + 1],
            glyphs,
            decoder,
            framebuffer,
            foreground: config.colors.foreground,
            background,
            config,
        };

        info!(
            "DrawContext: Canvas {}x{}, strip {}x{}, side menu {}x{}, scratch {} px",
            ctx.canvas.width(),
            ctx.canvas.height(),
            ctx.strip.width(),
            ctx.strip.height(),
            ctx.side_menu.width(),
            ctx.side_menu.height(),
            ctx.scratch.len()
        );
        Ok(ctx)
    }

    /// Tear down the context, returning the framebuffer to the host.
    pub fn shutdown(self) -> Framebuffer {
        info!("DrawContext: Shutting down");
        self.framebuffer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn layer(&self, layer: Layer) -> &PixelBuffer {
        match layer {
            Layer::Canvas => &self.canvas,
            Layer::Strip => &self.strip,
            Layer::SideMenu => &self.side_menu,
        }
    }

    pub fn layer_mut(&mut self, layer: Layer) -> &mut PixelBuffer {
        match layer {
            Layer::Canvas => &mut self.canvas,
            Layer::Strip => &mut self.strip,
            Layer::SideMenu => &mut self.side_menu,
        }
    }

    pub fn has_text(&self) -> bool {
        self.glyphs.is_some()
    }

    // --- Text ---

    /// Rescale the font. Cached glyphs are dropped only when the size or
    /// weight actually changes.
    pub fn set_font(&mut self, width: f32, height: f32, weight: f32, spacing: i32) {
        let Some(cache) = self.glyphs.as_mut() else {
            return;
        };
        let cell = ATLAS_CELL as f32;
        if cache.font_size() == (width.min(cell), height.min(cell), weight) {
            cache.set_spacing(spacing);
        } else {
            cache.configure(width, height, weight, spacing);
        }
    }

    pub fn set_colors(&mut self, foreground: u32, background: u32) {
        self.foreground = foreground;
        self.background = background;
    }

    pub fn colors(&self) -> (u32, u32) {
        (self.foreground, self.background)
    }

    /// Line height of the current font; 0 when text is disabled.
    pub fn line_height(&self) -> i32 {
        self.glyphs.as_ref().map_or(0, |g| g.line_height())
    }

    fn text_shadow(&self) -> Option<u32> {
        if !self.config.effects.text_shadow {
            None
        } else if self.config.display.width == NO_SHADOW_WIDTH {
            Some(0)
        } else {
            Some(SHADOW_GRAY)
        }
    }

    /// Draw UTF-8 `text` into `layer` in the foreground colour.
    ///
    /// [`TextAnchor::Center`] centers within the layer's own width, so strip
    /// and side-menu text centers on that layer rather than the display.
    ///
    /// # Returns
    /// The pen x after the last glyph. With text disabled nothing is drawn
    /// and the starting x is returned.
    pub fn draw_text(&mut self, layer: Layer, anchor: TextAnchor, y: u32, text: &str) -> u32 {
        let shadow = self.text_shadow();
        let foreground = self.foreground;
        let Some(cache) = self.glyphs.as_mut() else {
            return start_x(anchor);
        };
        let dest = match layer {
            Layer::Canvas => &mut self.canvas,
            Layer::Strip => &mut self.strip,
            Layer::SideMenu => &mut self.side_menu,
        };
        let width = dest.width();
        TextShaper::new(cache, foreground, width)
            .with_shadow(shadow)
            .draw_text(dest, anchor, y, text.as_bytes())
    }

    /// Draw raw UTF-8 bytes into a caller-owned surface, centering within
    /// `layout_width`.
    pub fn draw_text_into<S: Surface>(
        &mut self,
        dest: &mut S,
        layout_width: u32,
        anchor: TextAnchor,
        y: u32,
        text: &[u8],
    ) -> u32 {
        let shadow = self.text_shadow();
        let foreground = self.foreground;
        let Some(cache) = self.glyphs.as_mut() else {
            return start_x(anchor);
        };
        TextShaper::new(cache, foreground, layout_width)
            .with_shadow(shadow)
            .draw_text(dest, anchor, y, text)
    }

    // --- Images ---

    fn check_slot(slot: usize) -> Result<()> {
        if slot > IMG_MAX {
            return Err(RenderError::InvalidSlot {
                slot,
                max: IMG_MAX,
            });
        }
        Ok(())
    }

    /// Load `path` (or `fallback`, or a placeholder) into `slot`.
    ///
    /// Slot 0 overwrites the canvas. Any other slot evicts whichever slot
    /// last held the scratch buffer.
    pub fn load_image(&mut self, slot: usize, path: &Path, fallback: Option<&Path>) -> Result<Image> {
        Self::check_slot(slot)?;
        if path.as_os_str().is_empty() {
            return Err(RenderError::EmptyPath);
        }

        let policy = LoadPolicy {
            profile: self.config.profile.clone(),
            display_height: self.config.display.height,
            placeholder: self.config.colors.placeholder,
            max_width: self.config.canvas.image_max_width,
            max_height: self.config.canvas.image_max_height,
        };
        // The loader writes into the target before it can fail, so the
        // previous contents are gone either way.
        self.images[slot] = None;
        if slot != CANVAS_SLOT {
            if let Some(prev) = self.scratch_owner.take().filter(|&prev| prev != slot) {
                debug!("DrawContext: Slot {} evicts slot {} from scratch", slot, prev);
            }
        }
        let pixels = if slot == CANVAS_SLOT {
            self.canvas.pixels_mut()
        } else {
            self.scratch.as_mut_slice()
        };
        let image = image::load_image(&self.decoder, &policy, slot, path, fallback, pixels)?;

        if slot != CANVAS_SLOT {
            self.scratch_owner = Some(slot);
        }
        self.images[slot] = Some(image);
        Ok(image)
    }

    /// Geometry of the image in `slot`, with its last blit position.
    pub fn image(&self, slot: usize) -> Result<Image> {
        Self::check_slot(slot)?;
        let image = self.images[slot].ok_or(RenderError::EmptySlot(slot))?;
        if slot != CANVAS_SLOT {
            match self.scratch_owner {
                Some(owner) if owner != slot => {
                    return Err(RenderError::StaleImage {
                        slot,
                        resident: owner,
                    })
                }
                Some(_) => {}
                None => return Err(RenderError::EmptySlot(slot)),
            }
        }
        Ok(image)
    }

    /// Copy the image in `slot` to the framebuffer at `(x, y)` and remember
    /// the position for frames and backdrops.
    pub fn blit_image(&mut self, slot: usize, x: u32, y: u32) -> Result<()> {
        let mut image = self.image(slot)?;
        image.x = x;
        image.y = y;
        self.images[slot] = Some(image);

        let pixels = if slot == CANVAS_SLOT {
            self.canvas.pixels()
        } else {
            &self.scratch[..]
        };
        let tint = self.config.colors.backdrop_tint;
        compositor::blit_image(&mut self.framebuffer, &image, pixels, x, y, tint);
        Ok(())
    }

    // --- Framebuffer primitives ---

    pub fn draw_box(&mut self, color: u32, x: u32, y: u32, width: u32, height: u32) {
        compositor::draw_box(&mut self.framebuffer, color, x, y, width, height);
    }

    /// Outline the image in `slot` with a border just outside its edges.
    pub fn draw_selection_frame(&mut self, slot: usize, color: u32) -> Result<()> {
        let image = self.image(slot)?;
        let (fb_w, fb_h) = (self.framebuffer.width(), self.framebuffer.height());
        for rect in frame_rects(&image) {
            if let Some((x, y, w, h)) = rect.clip(fb_w, fb_h) {
                compositor::draw_box(&mut self.framebuffer, color, x, y, w, h);
            }
        }
        Ok(())
    }

    /// Draw a drop shadow below and right of the image in `slot` from a
    /// dimmed copy of the canvas. With `restore`, the canvas is first
    /// copied back over the frame ring to erase a previous selection.
    pub fn draw_backdrop(&mut self, slot: usize, restore: bool) -> Result<()> {
        let image = self.image(slot)?;
        if restore {
            for rect in frame_rects(&image) {
                compositor::copy_rect(&self.canvas, &mut self.framebuffer, rect);
            }
        }
        let factor = self.config.effects.backdrop_dim;
        for rect in backdrop_rects(&image) {
            compositor::copy_dimmed(&self.canvas, &mut self.framebuffer, rect, factor);
        }
        Ok(())
    }

    // --- Frame transfer ---

    pub fn publish_frame(&mut self) -> Result<()> {
        self.framebuffer.publish(&self.canvas)
    }

    /// Copy `layer` to the framebuffer with its top-left at `(x, y)`.
    pub fn publish_layer(&mut self, layer: Layer, x: u32, y: u32) -> Result<()> {
        let src = match layer {
            Layer::Canvas => &self.canvas,
            Layer::Strip => &self.strip,
            Layer::SideMenu => &self.side_menu,
        };
        self.framebuffer.publish_region(src, x, y)
    }

    pub fn capture_background(&self, x: u32, y: u32, width: u32, height: u32) -> Result<PixelBuffer> {
        self.framebuffer.capture(x, y, width, height)
    }

    /// Put back a region saved by [`capture_background`](Self::capture_background).
    pub fn restore_background(&mut self, saved: &PixelBuffer, x: u32, y: u32) -> Result<()> {
        self.framebuffer.publish_region(saved, x, y)
    }

    /// Wipe framebuffer rows `[start, end)` toward the middle. Blocks for
    /// the duration of the animation.
    pub fn fade_out(&mut self, start: u32, end: u32) {
        let step = Duration::from_micros(self.config.effects.fade_step_us);
        self.framebuffer.fade_out(start, end, step);
    }

    pub fn dim_layer(&mut self, layer: Layer, top: u32, bottom: u32, factor: f32) {
        compositor::dim_region(self.layer_mut(layer), top, bottom, factor);
    }

    /// Fill `layer` with the background colour.
    pub fn clear_layer(&mut self, layer: Layer) {
        let background = self.background;
        self.layer_mut(layer).fill(background);
    }
}

fn start_x(anchor: TextAnchor) -> u32 {
    match anchor {
        TextAnchor::Left(x) => x,
        TextAnchor::Center => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::PLACEHOLDER_GRAY;
    use crate::config::DisplayConfig;
    use crate::image::DecodedImage;
    use crate::rasterizer::{HeadlessFontDriver, LineLayout, RasterizedGlyph};
    use test_log::test;

    /// Fills the target with `color` at a fixed size for any existing path.
    struct SolidDecoder {
        width: u32,
        height: u32,
        color: u32,
        has_alpha_mask: bool,
    }

    impl ImageDecoder for SolidDecoder {
        fn decode(&self, _path: &Path, target: &mut [u32]) -> Result<DecodedImage> {
            let count = (self.width * self.height) as usize;
            target[..count].fill(self.color);
            Ok(DecodedImage {
                width: self.width,
                height: self.height,
                has_alpha_mask: self.has_alpha_mask,
            })
        }
    }

    fn solid(width: u32, height: u32, color: u32) -> SolidDecoder {
        SolidDecoder {
            width,
            height,
            color,
            has_alpha_mask: false,
        }
    }

    struct NoFontDriver;

    impl FontDriver for NoFontDriver {
        type Font = ();

        fn open_font(&self, _style: FontStyle) -> anyhow::Result<()> {
            anyhow::bail!("no font service")
        }

        fn set_scale(&self, _font: &mut (), _w: f32, _h: f32, _weight: f32) {}

        fn line_layout(&self, _font: &()) -> LineLayout {
            LineLayout::default()
        }

        fn rasterize_glyph(&self, _font: &(), _code: u32) -> Option<RasterizedGlyph> {
            None
        }
    }

    /// A 64x48 display on a 64-pixel pitch, short enough to skip rescaling.
    fn small_config() -> Config {
        let mut config = Config::default();
        config.display = DisplayConfig::for_mode(64, 48);
        config.canvas.width = 64;
        config.canvas.height = 48;
        config.canvas.strip_height = 8;
        config.canvas.side_menu_width = 16;
        config.canvas.side_menu_height = 48;
        config.canvas.image_max_width = 16;
        config.canvas.image_max_height = 16;
        config.font.width = 4.0;
        config.font.height = 4.0;
        config.font.spacing = 0;
        config.effects.fade_step_us = 0;
        config.effects.text_shadow = false;
        config
    }

    fn context(decoder: SolidDecoder) -> DrawContext<HeadlessFontDriver, SolidDecoder> {
        DrawContext::init(small_config(), HeadlessFontDriver::new(), decoder).unwrap()
    }

    fn existing_file() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    #[test]
    fn test_slot_bounds_and_empty_path() {
        let mut ctx = context(solid(2, 2, 1));
        let file = existing_file();
        assert!(matches!(
            ctx.load_image(IMG_MAX + 1, file.path(), None),
            Err(RenderError::InvalidSlot { slot: 11, max: 10 })
        ));
        assert!(matches!(
            ctx.load_image(1, Path::new(""), None),
            Err(RenderError::EmptyPath)
        ));
        assert!(matches!(ctx.image(3), Err(RenderError::EmptySlot(3))));
        assert!(ctx.blit_image(IMG_MAX + 1, 0, 0).is_err());
    }

    #[test]
    fn test_later_load_makes_earlier_slot_stale() {
        let mut ctx = context(solid(2, 2, 0xFF11_2233));
        let file = existing_file();
        ctx.load_image(1, file.path(), None).unwrap();
        ctx.load_image(2, file.path(), None).unwrap();

        assert!(matches!(
            ctx.blit_image(1, 0, 0),
            Err(RenderError::StaleImage {
                slot: 1,
                resident: 2
            })
        ));
        ctx.blit_image(2, 4, 6).unwrap();
        assert_eq!(ctx.framebuffer().pixel(5, 7), 0xFF11_2233);
        assert_eq!(ctx.image(2).unwrap().x, 4);
    }

    /// Scribbles over the whole target, then fails for paths containing "bad".
    struct ScribblingDecoder;

    impl ImageDecoder for ScribblingDecoder {
        fn decode(&self, path: &Path, target: &mut [u32]) -> Result<DecodedImage> {
            target.fill(0xDEAD_BEEF);
            if path.to_string_lossy().contains("bad") {
                return Err(RenderError::Decode(format!("{}: corrupt", path.display())));
            }
            Ok(DecodedImage {
                width: 2,
                height: 2,
                has_alpha_mask: false,
            })
        }
    }

    #[test]
    fn test_failed_load_releases_scratch() {
        // Contract: a load that fails after writing the scratch leaves no
        // slot claiming it, so the earlier owner cannot blit the scribble.
        let mut ctx =
            DrawContext::init(small_config(), HeadlessFontDriver::new(), ScribblingDecoder)
                .unwrap();
        let good = existing_file();
        let dir = tempfile::TempDir::new().unwrap();
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"x").unwrap();

        ctx.load_image(1, good.path(), None).unwrap();
        // The 16x16 scratch cannot hold the placeholder either.
        assert!(matches!(
            ctx.load_image(2, &bad, None),
            Err(RenderError::BufferTooSmall { .. })
        ));

        assert!(matches!(ctx.image(1), Err(RenderError::EmptySlot(1))));
        assert!(matches!(ctx.image(2), Err(RenderError::EmptySlot(2))));
        assert!(ctx.blit_image(1, 0, 0).is_err());
        assert_eq!(ctx.framebuffer().pixel(0, 0), 0);

        ctx.load_image(1, good.path(), None).unwrap();
        ctx.blit_image(1, 0, 0).unwrap();
        assert_eq!(ctx.framebuffer().pixel(1, 1), 0xDEAD_BEEF);
    }

    #[test]
    fn test_masked_blit_uses_configured_tint() {
        // Contract: masked images composite over the configured backdrop
        // tint, not the built-in default.
        let mut config = small_config();
        config.colors.backdrop_tint = 0xFF00_00FF;
        let decoder = SolidDecoder {
            has_alpha_mask: true,
            ..solid(4, 4, 0x0000_0000)
        };
        let mut ctx = DrawContext::init(config, HeadlessFontDriver::new(), decoder).unwrap();
        let file = existing_file();
        ctx.load_image(1, file.path(), None).unwrap();
        ctx.blit_image(1, 8, 8).unwrap();

        assert_eq!(ctx.framebuffer().pixel(9, 9), 0xFF00_00FF);
        assert_eq!(ctx.framebuffer().pixel(7, 7), 0);
    }

    #[test]
    fn test_canvas_slot_survives_scratch_loads() {
        let mut ctx = context(solid(4, 4, 0xFF00_00FF));
        let file = existing_file();
        ctx.load_image(CANVAS_SLOT, file.path(), None).unwrap();
        ctx.load_image(5, file.path(), None).unwrap();
        assert!(ctx.image(CANVAS_SLOT).is_ok());
        assert_eq!(ctx.layer(Layer::Canvas).pixel(3, 0), 0xFF00_00FF);
    }

    #[test]
    fn test_missing_image_uses_placeholder() {
        let mut config = small_config();
        config.canvas.image_max_width = 128;
        config.canvas.image_max_height = 160;
        config.profile.games_per_page = 40;
        let mut ctx =
            DrawContext::init(config, HeadlessFontDriver::new(), FileDecoder).unwrap();
        let image = ctx
            .load_image(1, Path::new("/nonexistent/a.jpg"), Some(Path::new("/nonexistent/b.png")))
            .unwrap();
        assert_eq!((image.width, image.height), (120, 160));
        assert!(ctx.scratch[..120 * 160].iter().all(|&p| p == PLACEHOLDER_GRAY));
    }

    #[test]
    fn test_selection_frame_surrounds_image() {
        let mut ctx = context(solid(8, 8, 0xFF00_FF00));
        let file = existing_file();
        ctx.load_image(1, file.path(), None).unwrap();
        ctx.blit_image(1, 20, 20).unwrap();
        ctx.draw_selection_frame(1, 0xFFFF_0000).unwrap();

        let fb = ctx.framebuffer();
        assert_eq!(fb.pixel(4, 4), 0xFFFF_0000);
        assert_eq!(fb.pixel(43, 43), 0xFFFF_0000);
        assert_eq!(fb.pixel(19, 24), 0xFFFF_0000);
        assert_eq!(fb.pixel(28, 24), 0xFFFF_0000);
        assert_eq!(fb.pixel(24, 24), 0xFF00_FF00);
        assert_eq!(fb.pixel(3, 3), 0);
    }

    #[test]
    fn test_frame_near_origin_is_clipped() {
        let mut ctx = context(solid(4, 4, 0xFF00_FF00));
        let file = existing_file();
        ctx.load_image(1, file.path(), None).unwrap();
        ctx.blit_image(1, 2, 2).unwrap();
        ctx.draw_selection_frame(1, 0xFFFF_0000).unwrap();
        assert_eq!(ctx.framebuffer().pixel(0, 0), 0xFFFF_0000);
        assert_eq!(ctx.framebuffer().pixel(2, 2), 0xFF00_FF00);
    }

    #[test]
    fn test_backdrop_dims_canvas_into_shadow() {
        let mut config = small_config();
        config.canvas.image_max_width = 32;
        config.canvas.image_max_height = 32;
        let mut ctx = DrawContext::init(
            config,
            HeadlessFontDriver::new(),
            solid(24, 24, 0xFF00_FF00),
        )
        .unwrap();
        ctx.layer_mut(Layer::Canvas).fill(0xFF64_6464);
        let file = existing_file();
        ctx.load_image(1, file.path(), None).unwrap();
        ctx.blit_image(1, 4, 4).unwrap();
        ctx.draw_backdrop(1, false).unwrap();

        let dimmed = compositor::dim_pixel(0xFF64_6464, 0.70);
        let fb = ctx.framebuffer();
        // Right bar starts one border width down; bottom bar one border right.
        assert_eq!(fb.pixel(28, 20), dimmed);
        assert_eq!(fb.pixel(28, 19), 0);
        assert_eq!(fb.pixel(20, 28), dimmed);
        assert_eq!(fb.pixel(19, 28), 0);
        assert_eq!(fb.pixel(8, 8), 0xFF00_FF00);
    }

    #[test]
    fn test_backdrop_restore_erases_frame() {
        let mut ctx = context(solid(8, 8, 0xFF00_FF00));
        let file = existing_file();
        ctx.load_image(1, file.path(), None).unwrap();
        ctx.blit_image(1, 20, 20).unwrap();
        ctx.draw_selection_frame(1, 0xFFFF_0000).unwrap();
        ctx.draw_backdrop(1, true).unwrap();

        let background = ctx.config().colors.background;
        assert_eq!(ctx.framebuffer().pixel(4, 4), background);
        assert_eq!(ctx.framebuffer().pixel(19, 24), background);
    }

    #[test]
    fn test_text_disabled_without_font() {
        let mut ctx =
            DrawContext::init(small_config(), NoFontDriver, solid(1, 1, 0)).unwrap();
        assert!(!ctx.has_text());
        assert_eq!(ctx.line_height(), 0);
        let before = ctx.layer(Layer::Canvas).clone();
        assert_eq!(ctx.draw_text(Layer::Canvas, TextAnchor::Left(3), 0, "hello"), 3);
        assert_eq!(ctx.layer(Layer::Canvas), &before);
        ctx.set_font(8.0, 8.0, 1.0, 0);
    }

    #[test]
    fn test_draw_text_into_strip_and_publish() {
        let mut ctx = context(solid(1, 1, 0));
        ctx.set_colors(0xFFFF_FFFF, 0xFF00_0000);
        ctx.clear_layer(Layer::Strip);
        let end = ctx.draw_text(Layer::Strip, TextAnchor::Left(2), 0, "ab");
        assert_eq!(end, 10);
        assert_eq!(ctx.layer(Layer::Strip).pixel(2, 0), 0xFFFF_FFFF);

        ctx.publish_layer(Layer::Strip, 0, 40).unwrap();
        assert_eq!(ctx.framebuffer().pixel(2, 40), 0xFFFF_FFFF);
        assert_eq!(ctx.framebuffer().pixel(0, 40), 0xFF00_0000);
        assert!(ctx.publish_layer(Layer::Strip, 0, 41).is_err());
    }

    #[test]
    fn test_centered_text_uses_layer_width() {
        // Contract: centering is relative to the target layer, so text in
        // the 16-wide side menu lands at x 4, not at the canvas middle.
        let mut ctx = context(solid(1, 1, 0));
        ctx.set_colors(0xFFFF_FFFF, 0xFF00_0000);
        ctx.clear_layer(Layer::SideMenu);
        let end = ctx.draw_text(Layer::SideMenu, TextAnchor::Center, 0, "ab");
        assert_eq!(end, 12);
        let menu = ctx.layer(Layer::SideMenu);
        assert_eq!(menu.pixel(3, 0), 0xFF00_0000);
        assert_eq!(menu.pixel(4, 0), 0xFFFF_FFFF);
    }

    #[test]
    fn test_set_font_keeps_cache_for_spacing_change() {
        let mut ctx = context(solid(1, 1, 0));
        ctx.draw_text(Layer::Canvas, TextAnchor::Left(0), 0, "a");
        assert_eq!(ctx.glyphs.as_ref().unwrap().count(), 1);

        ctx.set_font(4.0, 4.0, 1.0, 3);
        assert_eq!(ctx.glyphs.as_ref().unwrap().count(), 1);
        assert_eq!(ctx.glyphs.as_ref().unwrap().spacing(), 3);

        ctx.set_font(6.0, 6.0, 1.0, 3);
        assert_eq!(ctx.glyphs.as_ref().unwrap().count(), 0);
        assert_eq!(ctx.line_height(), 10);
    }

    #[test]
    fn test_shadow_colour_depends_on_display_width() {
        let mut config = small_config();
        config.effects.text_shadow = true;
        let ctx: DrawContext<HeadlessFontDriver, SolidDecoder> =
            DrawContext::init(config, HeadlessFontDriver::new(), solid(1, 1, 0)).unwrap();
        assert_eq!(ctx.text_shadow(), Some(SHADOW_GRAY));

        let mut config = Config::default();
        config.effects.text_shadow = true;
        let ctx: DrawContext<HeadlessFontDriver, SolidDecoder> =
            DrawContext::init(config, HeadlessFontDriver::new(), solid(1, 1, 0)).unwrap();
        assert_eq!(ctx.text_shadow(), Some(0));
    }

    #[test]
    fn test_mismatched_framebuffer_is_rejected() {
        let fb = Framebuffer::new(DisplayConfig::for_mode(32, 32)).unwrap();
        let result = DrawContext::init_with_framebuffer(
            small_config(),
            fb,
            HeadlessFontDriver::new(),
            solid(1, 1, 0),
        );
        assert!(matches!(result, Err(RenderError::InvalidDisplay(_))));
    }
}
