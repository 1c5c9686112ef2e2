// src/scaler.rs

//! In-place nearest-neighbour rescaling of a loaded image.
//!
//! Both operations work inside the buffer the image was decoded into, so the
//! traversal order is what keeps unread source pixels intact.

use log::{debug, warn};

use crate::error::{RenderError, Result};
use crate::image::Image;

/// Upper bound on halving passes; a `u32` dimension reaches zero within 32.
const MAX_DOWNSCALE_PASSES: u32 = 32;

/// Replace each pixel with a 2x2 block, doubling width and height.
///
/// `pixels` must hold `4 * width * height` pixels. Rows and columns are
/// walked from the end so every destination lies at or after its source
/// and never overwrites a pixel still to be read.
pub fn upscale_2x(image: &mut Image, pixels: &mut [u32]) -> Result<()> {
    let w = image.width as usize;
    let h = image.height as usize;
    let required = 4 * w * h;
    if pixels.len() < required {
        return Err(RenderError::BufferTooSmall {
            required,
            available: pixels.len(),
        });
    }

    let tw = 2 * w;
    for y in (0..h).rev() {
        let src_row = y * w;
        let top = 2 * y * tw;
        let bottom = top + tw;
        for x in (0..w).rev() {
            let px = pixels[src_row + x];
            pixels[top + 2 * x] = px;
            pixels[top + 2 * x + 1] = px;
            pixels[bottom + 2 * x] = px;
            pixels[bottom + 2 * x + 1] = px;
        }
    }

    image.width *= 2;
    image.height *= 2;
    debug!("upscale_2x: now {}x{}", image.width, image.height);
    Ok(())
}

/// Halve the image until both dimensions are at most `max_dimension`.
///
/// Each pass keeps every second pixel of every second row, so after `n`
/// passes pixel `(x, y)` is the original pixel `(x << n, y << n)`.
/// `pixels` must hold `width * height` pixels.
///
/// # Returns
/// The overall sampling factor (1 if the image already fit).
pub fn downscale_pow2(image: &mut Image, pixels: &mut [u32], max_dimension: u32) -> Result<u32> {
    let required = image.width as usize * image.height as usize;
    if pixels.len() < required {
        return Err(RenderError::BufferTooSmall {
            required,
            available: pixels.len(),
        });
    }

    let mut factor = 1u32;
    let mut passes = 0;

    while image.width > max_dimension || image.height > max_dimension {
        if passes == MAX_DOWNSCALE_PASSES {
            warn!(
                "downscale_pow2: gave up after {} passes at {}x{}",
                passes, image.width, image.height
            );
            break;
        }
        halve(image, pixels);
        factor = factor.saturating_mul(2);
        passes += 1;
    }

    if factor > 1 {
        debug!(
            "downscale_pow2: factor {} -> {}x{}",
            factor, image.width, image.height
        );
    }
    Ok(factor)
}

fn halve(image: &mut Image, pixels: &mut [u32]) {
    let w = image.width as usize;
    let nw = w / 2;
    let nh = image.height as usize / 2;
    // Destination index y * nw + x never exceeds its source 2y * w + 2x, and
    // sources are read in increasing order, so a forward walk is safe.
    for y in 0..nh {
        for x in 0..nw {
            pixels[y * nw + x] = pixels[2 * y * w + 2 * x];
        }
    }
    image.width = nw as u32;
    image.height = nh as u32;
}
