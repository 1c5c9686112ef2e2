//! Glyph rasterization and caching.
//!
//! ```text
//! code point ──► GlyphCache ──hit──► &Glyph (coverage + metrics)
//!                    │
//!                   miss
//!                    ▼
//!               FontDriver::rasterize_glyph  (host font service)
//! ```
//!
//! The driver is injected by the embedding environment. `HeadlessFontDriver`
//! stands in for it when no font service exists.

pub mod font_driver;
pub mod glyph_cache;
pub mod headless_font_driver;

pub use font_driver::{FontDriver, FontStyle, GlyphMetrics, LineLayout, RasterizedGlyph};
pub use glyph_cache::{Glyph, GlyphCache, ATLAS_CELL, FONT_CACHE_MAX};
pub use headless_font_driver::HeadlessFontDriver;
