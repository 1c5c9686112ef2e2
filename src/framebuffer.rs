// src/framebuffer.rs

//! The physical video framebuffer.
//!
//! Memory is a sequence of 64-bit words, each holding two horizontally
//! adjacent pixels (left pixel in the high half). Rows are `pitch` pixels
//! apart and the visible frame starts `base_offset` pixels in, so pixel
//! `(x, y)` lives at pixel address `base_offset + y * pitch + x`, in word
//! `address / 2`.
//!
//! Bulk transfers (`publish`, `capture`, `fade_out`) move whole words. A
//! transfer starting on an odd column falls back to per-pixel access.

use std::thread;
use std::time::Duration;

use log::*;

use crate::color::{pack_pair, unpack_pair};
use crate::config::DisplayConfig;
use crate::error::{RenderError, Result};
use crate::pixel_buffer::{PixelBuffer, Surface};

pub struct Framebuffer {
    display: DisplayConfig,
    words: Vec<u64>,
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("display", &self.display)
            .field("words", &self.words.len())
            .finish()
    }
}

impl Framebuffer {
    /// Allocate zeroed framebuffer memory for `display`.
    pub fn new(display: DisplayConfig) -> Result<Self> {
        display.validate()?;
        let words = vec![0u64; display.memory_pixels().div_ceil(2)];
        info!(
            "Framebuffer: {}x{} pitch {} offset {} ({} words)",
            display.width,
            display.height,
            display.pitch,
            display.base_offset,
            words.len()
        );
        Ok(Self { display, words })
    }

    /// Wrap memory provided by the host.
    pub fn from_memory(display: DisplayConfig, words: Vec<u64>) -> Result<Self> {
        display.validate()?;
        let required = display.memory_pixels().div_ceil(2);
        if words.len() < required {
            return Err(RenderError::BufferTooSmall {
                required,
                available: words.len(),
            });
        }
        Ok(Self { display, words })
    }

    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    /// Raw word memory, for handing back to the host.
    pub fn memory(&self) -> &[u64] {
        &self.words
    }

    pub fn into_memory(self) -> Vec<u64> {
        self.words
    }

    /// Pixel address of logical `(x, y)`.
    #[inline]
    pub fn to_physical_address(&self, x: u32, y: u32) -> usize {
        self.display.base_offset as usize
            + y as usize * self.display.pitch as usize
            + x as usize
    }

    /// Index of the word holding pixel `(x, y)`.
    #[inline]
    pub fn word_index(&self, x: u32, y: u32) -> usize {
        self.to_physical_address(x, y) / 2
    }

    #[inline]
    fn is_word_aligned(&self, x: u32, y: u32) -> bool {
        self.to_physical_address(x, y) % 2 == 0
    }

    fn check_region(&self, x: u32, y: u32, width: u32, height: u32) -> Result<()> {
        let fits_x = x.checked_add(width).is_some_and(|r| r <= self.display.width);
        let fits_y = y.checked_add(height).is_some_and(|b| b <= self.display.height);
        if fits_x && fits_y {
            return Ok(());
        }
        Err(RenderError::OutOfBounds {
            x,
            y,
            width,
            height,
            bound_width: self.display.width,
            bound_height: self.display.height,
        })
    }

    /// Copy every row of `canvas` to the top-left of the frame.
    pub fn publish(&mut self, canvas: &PixelBuffer) -> Result<()> {
        self.publish_region(canvas, 0, 0)
    }

    /// Copy `src` into the frame with its top-left at `(x, y)`.
    pub fn publish_region(&mut self, src: &PixelBuffer, x: u32, y: u32) -> Result<()> {
        self.check_region(x, y, src.width(), src.height())?;
        trace!(
            "Framebuffer: publish {}x{} at ({}, {})",
            src.width(),
            src.height(),
            x,
            y
        );
        for row in 0..src.height() {
            self.write_row(x, y + row, src.row(row));
        }
        Ok(())
    }

    /// Copy a region of the frame into a new buffer.
    pub fn capture(&self, x: u32, y: u32, width: u32, height: u32) -> Result<PixelBuffer> {
        self.check_region(x, y, width, height)?;
        let mut out = PixelBuffer::new(width, height);
        for row in 0..height {
            self.read_row(x, y + row, out.row_mut(row));
        }
        debug!(
            "Framebuffer: captured {}x{} at ({}, {})",
            width, height, x, y
        );
        Ok(out)
    }

    /// Zero rows `[top, bottom)` from both ends toward the middle, pausing
    /// `step` after each pair of rows. Blocks until the wipe completes.
    pub fn fade_out(&mut self, top: u32, bottom: u32, step: Duration) {
        let bottom = bottom.min(self.display.height);
        if top >= bottom {
            return;
        }
        let rows = bottom - top;
        debug!(
            "Framebuffer: fade rows {}..{} in {} steps of {:?}",
            top,
            bottom,
            rows.div_ceil(2),
            step
        );
        for i in 0..rows.div_ceil(2) {
            self.clear_row(top + i);
            self.clear_row(bottom - 1 - i);
            if !step.is_zero() {
                thread::sleep(step);
            }
        }
    }

    fn clear_row(&mut self, y: u32) {
        let width = self.display.width;
        if self.is_word_aligned(0, y) {
            let start = self.word_index(0, y);
            self.words[start..start + width as usize / 2].fill(0);
            if width % 2 == 1 {
                self.set_pixel(width - 1, y, 0);
            }
        } else {
            for x in 0..width {
                self.set_pixel(x, y, 0);
            }
        }
    }
}

impl Surface for Framebuffer {
    #[inline]
    fn width(&self) -> u32 {
        self.display.width
    }

    #[inline]
    fn height(&self) -> u32 {
        self.display.height
    }

    fn pixel(&self, x: u32, y: u32) -> u32 {
        debug_assert!(self.contains(x, y));
        let addr = self.to_physical_address(x, y);
        let (left, right) = unpack_pair(self.words[addr / 2]);
        if addr % 2 == 0 {
            left
        } else {
            right
        }
    }

    fn set_pixel(&mut self, x: u32, y: u32, argb: u32) {
        debug_assert!(self.contains(x, y));
        let addr = self.to_physical_address(x, y);
        let word = &mut self.words[addr / 2];
        let (left, right) = unpack_pair(*word);
        *word = if addr % 2 == 0 {
            pack_pair(argb, right)
        } else {
            pack_pair(left, argb)
        };
    }

    fn read_pair(&self, x: u32, y: u32) -> u64 {
        if self.is_word_aligned(x, y) {
            self.words[self.word_index(x, y)]
        } else {
            pack_pair(self.pixel(x, y), self.pixel(x + 1, y))
        }
    }

    fn write_pair(&mut self, x: u32, y: u32, word: u64) {
        if self.is_word_aligned(x, y) {
            let idx = self.word_index(x, y);
            self.words[idx] = word;
        } else {
            let (left, right) = unpack_pair(word);
            self.set_pixel(x, y, left);
            self.set_pixel(x + 1, y, right);
        }
    }

    fn write_row(&mut self, x: u32, y: u32, pixels: &[u32]) {
        if !self.is_word_aligned(x, y) {
            for (i, &px) in pixels.iter().enumerate() {
                self.set_pixel(x + i as u32, y, px);
            }
            return;
        }
        let start = self.word_index(x, y);
        let mut pairs = pixels.chunks_exact(2);
        for (word, pair) in self.words[start..].iter_mut().zip(&mut pairs) {
            *word = pack_pair(pair[0], pair[1]);
        }
        if let [last] = pairs.remainder() {
            self.set_pixel(x + pixels.len() as u32 - 1, y, *last);
        }
    }

    fn read_row(&self, x: u32, y: u32, out: &mut [u32]) {
        if !self.is_word_aligned(x, y) {
            for (i, px) in out.iter_mut().enumerate() {
                *px = self.pixel(x + i as u32, y);
            }
            return;
        }
        let start = self.word_index(x, y);
        let len = out.len();
        let mut pairs = out.chunks_exact_mut(2);
        for (pair, &word) in (&mut pairs).zip(&self.words[start..]) {
            let (left, right) = unpack_pair(word);
            pair[0] = left;
            pair[1] = right;
        }
        if let [last] = pairs.into_remainder() {
            *last = self.pixel(x + len as u32 - 1, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_log::test;

    fn display(width: u32, height: u32, pitch: u32, base_offset: u32) -> DisplayConfig {
        DisplayConfig {
            width,
            height,
            pitch,
            base_offset,
        }
    }

    fn numbered(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_pixels(width, height, (1..=width * height).collect()).unwrap()
    }

    #[test]
    fn test_address_uses_pitch_and_offset() {
        let fb = Framebuffer::new(DisplayConfig::for_mode(1920, 1080)).unwrap();
        assert_eq!(fb.to_physical_address(0, 1), 2048);
        assert_eq!(fb.to_physical_address(10, 2), 2 * 2048 + 10);
        assert_eq!(fb.word_index(10, 2), 2048 + 5);

        let fb = Framebuffer::new(display(8, 2, 10, 4)).unwrap();
        assert_eq!(fb.to_physical_address(3, 1), 4 + 10 + 3);
        assert_eq!(fb.memory().len(), (4 + 20) / 2);
    }

    #[test]
    fn test_publish_packs_pairs_left_high() {
        // Contract: publish writes pixel (2k, y) into the high half and
        // (2k+1, y) into the low half of word base/2 + (y*pitch)/2 + k.
        let mut fb = Framebuffer::new(display(4, 2, 6, 2)).unwrap();
        fb.publish(&numbered(4, 2)).unwrap();

        let words = fb.memory();
        assert_eq!(words[0], 0);
        assert_eq!(words[1], pack_pair(1, 2));
        assert_eq!(words[2], pack_pair(3, 4));
        // Pitch padding is untouched.
        assert_eq!(words[3], 0);
        assert_eq!(words[4], pack_pair(5, 6));
        assert_eq!(words[5], pack_pair(7, 8));
    }

    #[test]
    fn test_publish_rejects_oversized_canvas() {
        let mut fb = Framebuffer::new(display(4, 2, 4, 0)).unwrap();
        let err = fb.publish(&PixelBuffer::new(6, 2)).unwrap_err();
        assert!(matches!(
            err,
            RenderError::OutOfBounds {
                width: 6,
                bound_width: 4,
                ..
            }
        ));
        assert!(fb.capture(3, 0, 2, 1).is_err());
        assert!(fb.capture(u32::MAX, 0, 2, 1).is_err());
    }

    #[test]
    fn test_odd_column_region_round_trips() {
        let mut fb = Framebuffer::new(display(8, 4, 8, 0)).unwrap();
        let src = numbered(3, 2);
        fb.publish_region(&src, 1, 1).unwrap();
        assert_eq!(fb.pixel(0, 1), 0);
        assert_eq!(fb.pixel(1, 1), 1);
        assert_eq!(fb.pixel(3, 1), 3);
        assert_eq!(fb.pixel(4, 1), 0);
        assert_eq!(fb.capture(1, 1, 3, 2).unwrap(), src);
    }

    #[test]
    fn test_fade_out_clears_requested_rows() {
        let mut fb = Framebuffer::new(display(4, 6, 4, 0)).unwrap();
        fb.publish(&PixelBuffer::filled(4, 6, 0xFFFF_FFFF)).unwrap();
        fb.fade_out(1, 6, Duration::ZERO);
        assert!((0..4).all(|x| fb.pixel(x, 0) == 0xFFFF_FFFF));
        for y in 1..6 {
            assert!((0..4).all(|x| fb.pixel(x, y) == 0), "row {} not cleared", y);
        }
    }

    #[test]
    fn test_fade_out_ignores_empty_range() {
        let mut fb = Framebuffer::new(display(2, 2, 2, 0)).unwrap();
        fb.publish(&PixelBuffer::filled(2, 2, 7)).unwrap();
        fb.fade_out(2, 1, Duration::ZERO);
        fb.fade_out(0, 0, Duration::ZERO);
        assert_eq!(fb.pixel(1, 1), 7);
    }

    #[test]
    fn test_from_memory_checks_size() {
        let d = display(4, 2, 4, 0);
        assert!(Framebuffer::from_memory(d, vec![0; 4]).is_ok());
        assert!(matches!(
            Framebuffer::from_memory(d, vec![0; 3]),
            Err(RenderError::BufferTooSmall {
                required: 4,
                available: 3
            })
        ));
        assert!(Framebuffer::new(display(4, 2, 3, 0)).is_err());
    }

    proptest! {
        #[test]
        fn prop_publish_then_capture_is_identity(
            w in 1u32..12,
            h in 1u32..6,
            x in 0u32..8,
            y in 0u32..4,
        ) {
            let mut fb = Framebuffer::new(display(24, 12, 26, 6)).unwrap();
            let src = numbered(w, h);
            fb.publish_region(&src, x, y).unwrap();
            prop_assert_eq!(fb.capture(x, y, w, h).unwrap(), src);
        }
    }
}
