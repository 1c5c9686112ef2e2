// src/color.rs

//! ARGB8888 pixel helpers and the packed two-pixel word layout.
//!
//! A pixel is a `u32` laid out as `0xAARRGGBB`. The framebuffer moves pixels
//! in pairs packed into a `u64`; the left pixel occupies the high half so the
//! word reads in the same order as the two pixels in memory on the display's
//! big-endian bus.

/// Opaque black, the default background.
pub const OPAQUE_BLACK: u32 = 0xFF00_0000;
/// Opaque white, the default foreground.
pub const OPAQUE_WHITE: u32 = 0xFFFF_FFFF;
/// Flat mid-gray used for images that could not be loaded.
pub const PLACEHOLDER_GRAY: u32 = 0x8080_8080;
/// Translucent dark gray that masked images are composited over.
pub const BACKDROP_TINT: u32 = 0x8030_3030;
/// Text shadow on non-1080p display modes.
pub const SHADOW_GRAY: u32 = 0xFF33_3333;

/// Build a pixel from its four channels.
#[inline]
pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Split a pixel into `(a, r, g, b)`.
#[inline]
pub const fn channels(pixel: u32) -> (u8, u8, u8, u8) {
    (
        (pixel >> 24) as u8,
        (pixel >> 16) as u8,
        (pixel >> 8) as u8,
        pixel as u8,
    )
}

#[inline]
pub const fn alpha(pixel: u32) -> u8 {
    (pixel >> 24) as u8
}

/// Replace the alpha channel, keeping RGB.
#[inline]
pub const fn with_alpha(pixel: u32, a: u8) -> u32 {
    (pixel & 0x00FF_FFFF) | (a as u32) << 24
}

/// Pack two horizontally adjacent pixels into one framebuffer word.
#[inline]
pub const fn pack_pair(left: u32, right: u32) -> u64 {
    (left as u64) << 32 | right as u64
}

/// Inverse of [`pack_pair`]: returns `(left, right)`.
#[inline]
pub const fn unpack_pair(word: u64) -> (u32, u32) {
    ((word >> 32) as u32, word as u32)
}

/// A word holding the same pixel twice, used for solid fills.
#[inline]
pub const fn splat_pair(pixel: u32) -> u64 {
    pack_pair(pixel, pixel)
}
