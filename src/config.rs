// src/config.rs

//! Configuration for the overlay renderer.
//!
//! Every struct deserialises from JSON with `#[serde(default)]`, so a config
//! file only needs the fields it overrides. Defaults match the shipped
//! launcher: a 1920x1080 canvas on a 1080p display, 18x18 text, the
//! ten-per-page cover layout.

use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::color::{BACKDROP_TINT, OPAQUE_BLACK, OPAQUE_WHITE, PLACEHOLDER_GRAY};
use crate::error::RenderError;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub canvas: CanvasConfig,
    pub font: FontConfig,
    pub profile: DeviceProfile,
    pub colors: ColorConfig,
    pub effects: EffectsConfig,
}

impl Config {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        info!("Loaded config from '{}'", path.display());
        Ok(config)
    }

    /// Check that the canvas fits inside the display and the display
    /// geometry allows packed two-pixel transfers.
    pub fn validate(&self) -> Result<(), RenderError> {
        self.display.validate()?;
        if self.canvas.width > self.display.width || self.canvas.height > self.display.height {
            return Err(RenderError::InvalidDisplay(format!(
                "canvas {}x{} does not fit display {}x{}",
                self.canvas.width, self.canvas.height, self.display.width, self.display.height
            )));
        }
        if self.canvas.width % 2 != 0 {
            return Err(RenderError::InvalidDisplay(format!(
                "canvas width {} is not even",
                self.canvas.width
            )));
        }
        Ok(())
    }
}

// --- Display ---

/// Geometry of the physical framebuffer, supplied once by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Visible width in pixels.
    pub width: u32,
    /// Visible height in pixels.
    pub height: u32,
    /// Pixels per framebuffer row; at least `width`.
    pub pitch: u32,
    /// Pixel offset of the visible frame inside framebuffer memory.
    pub base_offset: u32,
}

impl DisplayConfig {
    /// Geometry for one of the known video modes, using the pitch the
    /// display controller allocates for that width.
    pub fn for_mode(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pitch: Self::pitch_for_width(width),
            base_offset: 0,
        }
    }

    /// 1920 -> 2048, 1280 -> 1280, 720 -> 768. Other widths are rounded up
    /// to an even pixel count.
    pub fn pitch_for_width(width: u32) -> u32 {
        match width {
            1920 => 2048,
            1280 => 1280,
            720 => 768,
            w => (w + 1) & !1,
        }
    }

    /// Framebuffer size in pixels, including the base offset.
    pub fn memory_pixels(&self) -> usize {
        self.base_offset as usize + self.pitch as usize * self.height as usize
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidDisplay(format!(
                "empty display {}x{}",
                self.width, self.height
            )));
        }
        if self.pitch < self.width {
            return Err(RenderError::InvalidDisplay(format!(
                "pitch {} is narrower than width {}",
                self.pitch, self.width
            )));
        }
        if self.pitch % 2 != 0 || self.base_offset % 2 != 0 {
            return Err(RenderError::InvalidDisplay(format!(
                "pitch {} and base offset {} must both be even",
                self.pitch, self.base_offset
            )));
        }
        Ok(())
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::for_mode(1920, 1080)
    }
}

// --- Buffers ---

/// Sizes of the buffers owned by the draw context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// Height of the overlay strip (info bar); its width is the canvas width.
    pub strip_height: u32,
    pub side_menu_width: u32,
    pub side_menu_height: u32,
    /// Largest non-canvas image the scratch buffer holds.
    pub image_max_width: u32,
    pub image_max_height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        CanvasConfig {
            width: 1920,
            height: 1080,
            strip_height: 96,
            side_menu_width: 400,
            side_menu_height: 1080,
            image_max_width: 384,
            image_max_height: 384,
        }
    }
}

// --- Font ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub width: f32,
    pub height: f32,
    pub weight: f32,
    /// Extra pixels between glyphs.
    pub spacing: i32,
    /// User font style setting, see `FontStyle::select`.
    pub style_setting: u32,
    pub system_language: u32,
}

impl Default for FontConfig {
    fn default() -> Self {
        FontConfig {
            width: 18.0,
            height: 18.0,
            weight: 1.0,
            spacing: 1,
            style_setting: 0,
            system_language: 1,
        }
    }
}

// --- Device class ---

/// Device-class layout profile. `games_per_page` selects between the
/// large-cover layout (10) and the dense grid (40).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub games_per_page: u32,
    /// Non-canvas images larger than this in either axis are halved until
    /// they fit (dense grid only).
    pub downscale_limit: u32,
    /// Images are only rescaled on displays at least this tall.
    pub rescale_min_display_height: u32,
}

impl DeviceProfile {
    pub const LARGE_COVERS: u32 = 10;
    pub const DENSE_GRID: u32 = 40;

    pub fn is_large_covers(&self) -> bool {
        self.games_per_page == Self::LARGE_COVERS
    }

    /// Size of the flat placeholder substituted for a missing image.
    pub fn placeholder_size(&self) -> (u32, u32) {
        if self.is_large_covers() {
            (260, 300)
        } else {
            (120, 160)
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        DeviceProfile {
            games_per_page: Self::LARGE_COVERS,
            downscale_limit: 168,
            rescale_min_display_height: 720,
        }
    }
}

// --- Colors ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub foreground: u32,
    pub background: u32,
    pub backdrop_tint: u32,
    pub placeholder: u32,
    pub selection_frame: u32,
}

impl Default for ColorConfig {
    fn default() -> Self {
        ColorConfig {
            foreground: OPAQUE_WHITE,
            background: OPAQUE_BLACK,
            backdrop_tint: BACKDROP_TINT,
            placeholder: PLACEHOLDER_GRAY,
            selection_frame: 0xFFFF_FFFF,
        }
    }
}

// --- Effects ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Channel multiplier for the drop shadow behind a highlighted image.
    pub backdrop_dim: f32,
    /// Pause between row pairs of the fade-out wipe, in microseconds.
    pub fade_step_us: u64,
    /// Draw a one-pixel drop shadow under text.
    pub text_shadow: bool,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        EffectsConfig {
            backdrop_dim: 0.70,
            fade_step_us: 250,
            text_shadow: true,
        }
    }
}
