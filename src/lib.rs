// src/lib.rs

//! Overlay renderer for a launcher UI running on top of a live video
//! framebuffer: cached glyph rendering, two-pass text layout, integer alpha
//! compositing, nearest-neighbour image rescaling and packed two-pixel
//! framebuffer transfer.
//!
//! Everything is reached through a [`DrawContext`]; the host injects a
//! [`FontDriver`] for glyph rasterization and an [`ImageDecoder`] for image
//! files.

pub mod color;
pub mod compositor;
pub mod config;
pub mod context;
pub mod error;
pub mod framebuffer;
pub mod image;
pub mod pixel_buffer;
pub mod rasterizer;
pub mod scaler;
pub mod text;

pub use config::Config;
pub use context::{DrawContext, Layer};
pub use error::{RenderError, Result};
pub use framebuffer::Framebuffer;
pub use image::{FileDecoder, Image, ImageDecoder, IMG_MAX};
pub use pixel_buffer::{PixelBuffer, Surface};
pub use rasterizer::{FontDriver, FontStyle, HeadlessFontDriver};
pub use text::TextAnchor;
