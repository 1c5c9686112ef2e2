// src/pixel_buffer.rs

//! Owned ARGB8888 pixel memory and the `Surface` abstraction over it.
//!
//! `PixelBuffer` backs the canvas, the overlay strip, the side menu and the
//! scratch image. It has no drawing behaviour of its own.
//!
//! `Surface` is the "row of pixels" seam every drawing routine writes
//! through. Its scalar methods define the semantics; `write_pair` and
//! `write_row` are fast paths that implementations may override (the
//! framebuffer stores a pair as one 64-bit word, `PixelBuffer` copies whole
//! rows with `copy_from_slice`), but they must stay observably identical to
//! a sequence of `set_pixel` calls.

use crate::color::{pack_pair, unpack_pair};
use crate::error::{RenderError, Result};

/// A rectangular pixel target.
///
/// Coordinates passed to the pixel accessors must lie inside
/// `width() x height()`; callers clip first. Out-of-range access panics.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn pixel(&self, x: u32, y: u32) -> u32;

    fn set_pixel(&mut self, x: u32, y: u32, argb: u32);

    /// Read pixels `x` and `x + 1` of row `y` as one packed word.
    fn read_pair(&self, x: u32, y: u32) -> u64 {
        pack_pair(self.pixel(x, y), self.pixel(x + 1, y))
    }

    /// Store a packed word at pixels `x` and `x + 1` of row `y`.
    fn write_pair(&mut self, x: u32, y: u32, word: u64) {
        let (left, right) = unpack_pair(word);
        self.set_pixel(x, y, left);
        self.set_pixel(x + 1, y, right);
    }

    /// Store four consecutive pixels starting at column `x`.
    fn write_quad(&mut self, x: u32, y: u32, quad: [u32; 4]) {
        self.write_pair(x, y, pack_pair(quad[0], quad[1]));
        self.write_pair(x + 2, y, pack_pair(quad[2], quad[3]));
    }

    /// Copy `pixels` into row `y` starting at column `x`, two at a time.
    fn write_row(&mut self, x: u32, y: u32, pixels: &[u32]) {
        let mut pairs = pixels.chunks_exact(2);
        let mut cx = x;
        for pair in &mut pairs {
            self.write_pair(cx, y, pack_pair(pair[0], pair[1]));
            cx += 2;
        }
        if let [last] = pairs.remainder() {
            self.set_pixel(cx, y, *last);
        }
    }

    /// Fill `out` from row `y` starting at column `x`.
    fn read_row(&self, x: u32, y: u32, out: &mut [u32]) {
        for (i, px) in out.iter_mut().enumerate() {
            *px = self.pixel(x + i as u32, y);
        }
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height()
    }
}

/// A fixed-size block of ARGB8888 pixels, row-major, no padding.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl PixelBuffer {
    /// Create a buffer of transparent black pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: u32, height: u32, argb: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![argb; width as usize * height as usize],
        }
    }

    /// Wrap existing pixel data. `pixels.len()` must equal `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self> {
        let required = width as usize * height as usize;
        if pixels.len() != required {
            return Err(RenderError::BufferTooSmall {
                required,
                available: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn row(&self, y: u32) -> &[u32] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u32] {
        let start = y as usize * self.width as usize;
        &mut self.pixels[start..start + self.width as usize]
    }

    pub fn fill(&mut self, argb: u32) {
        self.pixels.fill(argb);
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y as usize * self.width as usize + x as usize
    }
}

impl Surface for PixelBuffer {
    #[inline]
    fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[self.index(x, y)]
    }

    #[inline]
    fn set_pixel(&mut self, x: u32, y: u32, argb: u32) {
        let idx = self.index(x, y);
        self.pixels[idx] = argb;
    }

    fn write_row(&mut self, x: u32, y: u32, pixels: &[u32]) {
        let start = self.index(x, y);
        self.pixels[start..start + pixels.len()].copy_from_slice(pixels);
    }

    fn read_row(&self, x: u32, y: u32, out: &mut [u32]) {
        let start = self.index(x, y);
        out.copy_from_slice(&self.pixels[start..start + out.len()]);
    }
}
