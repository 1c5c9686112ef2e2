// src/text.rs

//! UTF-8 decoding and glyph layout.
//!
//! Text is laid out on a pen position: each glyph's bitmap is placed at
//! `(pen_x + bearing_x, baseline - bearing_y)` and the pen then moves by
//! `advance_x + spacing`. A `^` byte always starts a new line; `\n` does too
//! except in centered mode, where it is measured and drawn like any other
//! code point.
//!
//! A decode failure yields code 0, which ends the text exactly like a NUL
//! terminator. Callers get no signal that the remainder was dropped.

use log::trace;

use crate::compositor::blend;
use crate::pixel_buffer::Surface;
use crate::rasterizer::{FontDriver, Glyph, GlyphCache};

const LINE_BREAK: u32 = '^' as u32;
const NEWLINE: u32 = '\n' as u32;

/// Horizontal placement of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    /// Start at this column; line breaks return here.
    Left(u32),
    /// Center the first line within the layout width.
    Center,
}

/// Decode one UTF-8 sequence from the front of `bytes`.
///
/// # Returns
/// `(code_point, consumed_length)`. A NUL byte gives `(0, 1)`; an empty
/// input, an invalid lead byte, or a missing or malformed continuation byte
/// gives `(0, 0)`.
pub fn decode_utf8(bytes: &[u8]) -> (u32, usize) {
    let Some(&lead) = bytes.first() else {
        return (0, 0);
    };
    let lead = lead as u32;

    let (len, initial) = match lead {
        0x00..=0x7F => return (lead, 1),
        _ if lead & 0xE0 == 0xC0 => (2, lead & 0x1F),
        _ if lead & 0xF0 == 0xE0 => (3, lead & 0x0F),
        _ if lead & 0xF8 == 0xF0 => (4, lead & 0x07),
        _ => return (0, 0),
    };

    let Some(tail) = bytes.get(1..len) else {
        return (0, 0);
    };
    let mut code = initial;
    for &b in tail {
        if b & 0xC0 != 0x80 {
            return (0, 0);
        }
        code = code << 6 | (b as u32 & 0x3F);
    }
    (code, len)
}

/// Iterator over the code points of a byte string, stopping at the first
/// code 0 (terminator or decode failure).
#[derive(Debug, Clone)]
pub struct CodePoints<'a> {
    rest: &'a [u8],
}

impl<'a> CodePoints<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }
}

impl Iterator for CodePoints<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let (code, len) = decode_utf8(self.rest);
        if code == 0 {
            self.rest = &[];
            return None;
        }
        self.rest = &self.rest[len..];
        Some(code)
    }
}

/// Lays out and draws text through a glyph cache.
pub struct TextShaper<'a, D: FontDriver> {
    cache: &'a mut GlyphCache<D>,
    color: u32,
    shadow: Option<u32>,
    layout_width: u32,
}

impl<'a, D: FontDriver> TextShaper<'a, D> {
    /// A shaper drawing in `color`, centering within `layout_width`.
    pub fn new(cache: &'a mut GlyphCache<D>, color: u32, layout_width: u32) -> Self {
        Self {
            cache,
            color,
            shadow: None,
            layout_width,
        }
    }

    /// Draw a one-pixel shadow down and to the right of each inked pixel.
    pub fn with_shadow(mut self, shadow: Option<u32>) -> Self {
        self.shadow = shadow;
        self
    }

    /// Width of the first line as laid out in centered mode: the sum of
    /// `advance_x + spacing` over every glyph before the first `^`.
    pub fn measure(&mut self, text: &[u8]) -> i64 {
        let spacing = self.cache.spacing() as i64;
        let mut width = 0i64;
        for code in CodePoints::new(text) {
            if code == LINE_BREAK {
                break;
            }
            width += self.cache.lookup_or_render(code).metrics.advance_x as i64 + spacing;
        }
        width
    }

    /// Draw `text` into `dest` with the line's top at `y`.
    ///
    /// # Returns
    /// The pen x after the last glyph, for chaining runs on one line.
    pub fn draw_text<S: Surface>(
        &mut self,
        dest: &mut S,
        anchor: TextAnchor,
        y: u32,
        text: &[u8],
    ) -> u32 {
        let spacing = self.cache.spacing() as i64;
        let layout = self.cache.layout();
        let (left, centered) = match anchor {
            TextAnchor::Left(x) => (x as i64, false),
            TextAnchor::Center => {
                let width = self.measure(text);
                let start = (self.layout_width as i64 - width - spacing) / 2;
                (start.max(0), true)
            }
        };
        trace!("draw_text: {} bytes at ({}, {})", text.len(), left, y);

        let color = self.color;
        let shadow = self.shadow;
        let mut pen_x = left;
        let mut baseline = y as i64 + layout.baseline as i64;

        for code in CodePoints::new(text) {
            if code == LINE_BREAK || (code == NEWLINE && !centered) {
                pen_x = left;
                baseline += layout.line_height as i64;
                continue;
            }

            let glyph = self.cache.lookup_or_render(code);
            let origin_x = pen_x + glyph.metrics.bearing_x as i64;
            let origin_y = baseline - glyph.metrics.bearing_y as i64;
            draw_glyph(dest, glyph, origin_x, origin_y, color, shadow);
            pen_x += glyph.metrics.advance_x as i64 + spacing;
        }

        pen_x.clamp(0, u32::MAX as i64) as u32
    }
}

/// Blend a glyph's coverage, tinted with `color`, into `dest`.
fn draw_glyph<S: Surface>(
    dest: &mut S,
    glyph: &Glyph,
    origin_x: i64,
    origin_y: i64,
    color: u32,
    shadow: Option<u32>,
) {
    let (dest_w, dest_h) = (dest.width() as i64, dest.height() as i64);
    let rgb = color & 0x00FF_FFFF;
    let coverage = glyph.coverage();

    for row in 0..glyph.height as i64 {
        let py = origin_y + row;
        if py < 0 || py >= dest_h {
            continue;
        }
        for col in 0..glyph.width as i64 {
            let cov = coverage[(row * glyph.width as i64 + col) as usize];
            let px = origin_x + col;
            if cov == 0 || px < 0 || px >= dest_w {
                continue;
            }
            if let Some(shadow) = shadow {
                if px + 1 < dest_w && py + 1 < dest_h {
                    dest.set_pixel((px + 1) as u32, (py + 1) as u32, shadow);
                }
            }
            let (px, py) = (px as u32, py as u32);
            let under = dest.pixel(px, py);
            dest.set_pixel(px, py, blend(under, (cov as u32) << 24 | rgb));
        }
    }
}
