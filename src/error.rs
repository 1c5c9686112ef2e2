// src/error.rs

//! Error type shared by the rendering core.
//!
//! Only precondition violations surface as errors. Missing images and an
//! unavailable glyph rasterizer are recovered where they happen and logged.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("image slot {slot} out of range (max {max})")]
    InvalidSlot { slot: usize, max: usize },
    #[error("image slot {0} has no image loaded")]
    EmptySlot(usize),
    #[error("image path is empty")]
    EmptyPath,
    #[error("image slot {slot} was evicted from the scratch buffer by slot {resident}")]
    StaleImage { slot: usize, resident: usize },
    #[error("buffer holds {available} pixels, {required} required")]
    BufferTooSmall { required: usize, available: usize },
    #[error("region {width}x{height} at ({x}, {y}) exceeds {bound_width}x{bound_height}")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        bound_width: u32,
        bound_height: u32,
    },
    #[error("invalid display configuration: {0}")]
    InvalidDisplay(String),
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
