// src/compositor.rs

//! Pixel compositing: alpha blending, image blits, solid boxes and dimming.
//!
//! Every routine writes through the [`Surface`] trait and clips against the
//! destination before touching it, so out-of-range geometry draws the
//! visible part and nothing else.

use log::{debug, trace};

use crate::color::splat_pair;
use crate::image::Image;
use crate::pixel_buffer::Surface;

/// Width of the selection frame and backdrop borders.
pub const FRAME_THICKNESS: u32 = 16;

/// A rectangle in logical coordinates; may extend past any surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect with `[0, bound_width) x [0, bound_height)`.
    ///
    /// # Returns
    /// `(x, y, width, height)` of the visible part, or `None` if empty.
    pub fn clip(&self, bound_width: u32, bound_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (self.x + self.width as i64).min(bound_width as i64);
        let y1 = (self.y + self.height as i64).min(bound_height as i64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

/// Composite `fg` over `bg` (ARGB8888, straight alpha).
///
/// Each colour channel is `(fg * a + bg * (255 - a)) / 255`, floor division,
/// and the output alpha is `a + bg_a * (255 - a) / 255`. Red and blue are
/// computed together in one 32-bit lane pair; the division by 255 uses
/// `(x + 1 + (x >> 8)) >> 8`, exact for every `x <= 255 * 255`.
#[inline]
pub fn blend(bg: u32, fg: u32) -> u32 {
    let a = fg >> 24;
    if a == 0 {
        return bg;
    }
    let inv = 255 - a;

    // Lanes hold at most 255 * 255 < 2^16, so they never carry into each other.
    let rb = (fg & 0x00FF_00FF) * a + (bg & 0x00FF_00FF) * inv;
    let rb = ((rb + 0x0001_0001 + ((rb >> 8) & 0x00FF_00FF)) >> 8) & 0x00FF_00FF;

    let g = (fg & 0x0000_FF00) * a + (bg & 0x0000_FF00) * inv;
    let g = ((g + 0x0000_0100 + ((g >> 8) & 0x00FF_FF00)) >> 8) & 0x0000_FF00;

    let out_a = a + (bg >> 24) * inv / 255;
    out_a << 24 | rb | g
}

/// Scale the colour channels of `pixel` by `factor` (clamped to `[0, 1]`),
/// keeping alpha.
#[inline]
pub fn dim_pixel(pixel: u32, factor: f32) -> u32 {
    let factor = factor.clamp(0.0, 1.0);
    let scale = |shift: u32| (((pixel >> shift) & 0xFF) as f32 * factor) as u32;
    (pixel & 0xFF00_0000) | scale(16) << 16 | scale(8) << 8 | scale(0)
}

/// Dim every pixel of rows `[top, bottom)`.
pub fn dim_region<S: Surface>(dest: &mut S, top: u32, bottom: u32, factor: f32) {
    let bottom = bottom.min(dest.height());
    let width = dest.width() as usize;
    let mut row = vec![0u32; width];
    for y in top..bottom {
        dest.read_row(0, y, &mut row);
        for px in row.iter_mut() {
            *px = dim_pixel(*px, factor);
        }
        dest.write_row(0, y, &row);
    }
}

/// Copy `rect` from `src` to the same place in `dest`, dimming by `factor`.
pub fn copy_dimmed<S: Surface, D: Surface>(src: &S, dest: &mut D, rect: Rect, factor: f32) {
    copy_rect_with(src, dest, rect, |px| dim_pixel(px, factor));
}

/// Copy `rect` from `src` to the same place in `dest`.
pub fn copy_rect<S: Surface, D: Surface>(src: &S, dest: &mut D, rect: Rect) {
    copy_rect_with(src, dest, rect, |px| px);
}

fn copy_rect_with<S: Surface, D: Surface>(
    src: &S,
    dest: &mut D,
    rect: Rect,
    map: impl Fn(u32) -> u32,
) {
    let bound_w = src.width().min(dest.width());
    let bound_h = src.height().min(dest.height());
    let Some((x, y, w, h)) = rect.clip(bound_w, bound_h) else {
        return;
    };
    let mut row = vec![0u32; w as usize];
    for dy in y..y + h {
        src.read_row(x, dy, &mut row);
        for px in row.iter_mut() {
            *px = map(*px);
        }
        dest.write_row(x, dy, &row);
    }
}

/// Fill a solid box. `x` is aligned down to an even column so the box
/// starts on a framebuffer word.
pub fn draw_box<S: Surface>(dest: &mut S, color: u32, x: u32, y: u32, width: u32, height: u32) {
    let rect = Rect::new((x & !1) as i64, y as i64, width, height);
    let Some((x, y, w, h)) = rect.clip(dest.width(), dest.height()) else {
        return;
    };
    let word = splat_pair(color);
    for dy in y..y + h {
        let mut cx = x;
        while cx + 1 < x + w {
            dest.write_pair(cx, dy, word);
            cx += 2;
        }
        if cx < x + w {
            dest.set_pixel(cx, dy, color);
        }
    }
}

/// Copy an image onto `dest` at `(x, y)`.
///
/// `pixels` holds the image row-major at its own width. Three cases:
/// - width divisible by 4, no mask: four pixels per step
/// - no mask: two pixels per step, opaque copy
/// - mask: each pixel is composited over `tint` first
///
/// The first case is a throughput path only; its output equals the second.
pub fn blit_image<S: Surface>(
    dest: &mut S,
    image: &Image,
    pixels: &[u32],
    x: u32,
    y: u32,
    tint: u32,
) {
    let src_w = image.width as usize;
    let rect = Rect::new(x as i64, y as i64, image.width, image.height);
    let Some((_, _, w, h)) = rect.clip(dest.width(), dest.height()) else {
        return;
    };
    let w = w as usize;
    if pixels.len() < src_w * image.height as usize {
        debug!(
            "blit_image: {} pixels cannot back a {}x{} image",
            pixels.len(),
            image.width,
            image.height
        );
        return;
    }

    let quad_path = !image.has_alpha_mask && w % 4 == 0;
    trace!(
        "blit_image: {}x{} at ({}, {}) mask={} quad={}",
        w,
        h,
        x,
        y,
        image.has_alpha_mask,
        quad_path
    );

    let mut blended = Vec::new();
    for row in 0..h {
        let start = row as usize * src_w;
        let src = &pixels[start..start + w];
        let dy = y + row;

        if quad_path {
            let mut cx = x;
            for quad in src.chunks_exact(4) {
                dest.write_quad(cx, dy, [quad[0], quad[1], quad[2], quad[3]]);
                cx += 4;
            }
        } else if !image.has_alpha_mask {
            dest.write_row(x, dy, src);
        } else {
            blended.clear();
            blended.extend(src.iter().map(|&px| blend(tint, px)));
            dest.write_row(x, dy, &blended);
        }
    }
}

/// The four bars of a selection frame around `image`: top, bottom, left,
/// right. Top and bottom span the corners.
pub fn frame_rects(image: &Image) -> [Rect; 4] {
    let t = FRAME_THICKNESS;
    let (x, y) = (image.x as i64, image.y as i64);
    let (w, h) = (image.width, image.height);
    [
        Rect::new(x - t as i64, y - t as i64, w + 2 * t, t),
        Rect::new(x - t as i64, y + h as i64, w + 2 * t, t),
        Rect::new(x - t as i64, y, t, h),
        Rect::new(x + w as i64, y, t, h),
    ]
}

/// The drop-shadow L behind `image`: a bar down the right edge shifted
/// down by the border width, and a bar along the bottom edge shifted right.
pub fn backdrop_rects(image: &Image) -> [Rect; 2] {
    let t = FRAME_THICKNESS;
    let (x, y) = (image.x as i64, image.y as i64);
    let (w, h) = (image.width, image.height);
    [
        Rect::new(x + w as i64, y + t as i64, t, h),
        Rect::new(x + t as i64, y + h as i64, w.saturating_sub(t), t),
    ]
}
