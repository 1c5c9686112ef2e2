// src/image.rs

//! Image slots, file decoding and the load policy.
//!
//! Slot 0 is the canvas itself (a full-screen background); slots
//! `1..=IMG_MAX` all decode into one shared scratch buffer, so only one of
//! them holds valid pixels at a time.
//!
//! Decoding goes through the `ImageDecoder` trait. `FileDecoder` handles the
//! three on-disk formats by extension:
//!
//! | extension     | format                          | alpha mask |
//! |---------------|---------------------------------|------------|
//! | `.png`        | PNG, converted to RGBA          | yes        |
//! | `.argb`       | raw dump, see [`encode_argb`]   | yes        |
//! | anything else | JPEG, converted to RGB          | no         |

use std::fs;
use std::path::Path;

use ::image::{ImageFormat, ImageReader};
use log::*;

use crate::config::DeviceProfile;
use crate::error::{RenderError, Result};
use crate::scaler::{downscale_pow2, upscale_2x};

/// Highest valid slot index.
pub const IMG_MAX: usize = 10;

/// Slot whose pixels live in the canvas.
pub const CANVAS_SLOT: usize = 0;

/// Size of the `.argb` header: big-endian width then height.
const ARGB_HEADER_LEN: usize = 8;

/// Placement and geometry of a loaded image. The pixels live elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Image {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub has_alpha_mask: bool,
}

impl Image {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// What a decoder wrote into the target buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub has_alpha_mask: bool,
}

/// Decodes an image file into caller-provided pixel memory.
pub trait ImageDecoder {
    /// Decode `path` into `target` as row-major ARGB8888.
    ///
    /// Images with more pixels than `target` holds are rejected.
    fn decode(&self, path: &Path, target: &mut [u32]) -> Result<DecodedImage>;
}

/// Decoder for PNG, JPEG and raw `.argb` files.
#[derive(Debug, Clone, Default)]
pub struct FileDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Png,
    Argb,
    Jpeg,
}

impl FileKind {
    fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("png") => FileKind::Png,
            Some("argb") => FileKind::Argb,
            _ => FileKind::Jpeg,
        }
    }
}

impl ImageDecoder for FileDecoder {
    fn decode(&self, path: &Path, target: &mut [u32]) -> Result<DecodedImage> {
        let kind = FileKind::for_path(path);
        trace!("FileDecoder: {} as {:?}", path.display(), kind);
        match kind {
            FileKind::Argb => decode_argb(&fs::read(path)?, target),
            FileKind::Png => decode_with(path, ImageFormat::Png, target),
            FileKind::Jpeg => decode_with(path, ImageFormat::Jpeg, target),
        }
    }
}

fn check_capacity(width: u32, height: u32, target: &[u32]) -> Result<usize> {
    let required = width as usize * height as usize;
    if required > target.len() {
        return Err(RenderError::BufferTooSmall {
            required,
            available: target.len(),
        });
    }
    Ok(required)
}

fn decode_with(path: &Path, format: ImageFormat, target: &mut [u32]) -> Result<DecodedImage> {
    let mut reader = ImageReader::open(path)?;
    reader.set_format(format);
    let decoded = reader
        .decode()
        .map_err(|e| RenderError::Decode(format!("{}: {}", path.display(), e)))?;
    let (width, height) = (decoded.width(), decoded.height());
    let count = check_capacity(width, height, target)?;

    let has_alpha_mask = format == ImageFormat::Png;
    if has_alpha_mask {
        let rgba = decoded.to_rgba8();
        for (dst, px) in target[..count].iter_mut().zip(rgba.pixels()) {
            let [r, g, b, a] = px.0;
            *dst = u32::from_be_bytes([a, r, g, b]);
        }
    } else {
        let rgb = decoded.to_rgb8();
        for (dst, px) in target[..count].iter_mut().zip(rgb.pixels()) {
            let [r, g, b] = px.0;
            *dst = u32::from_be_bytes([0xFF, r, g, b]);
        }
    }

    Ok(DecodedImage {
        width,
        height,
        has_alpha_mask,
    })
}

/// Parse a raw `.argb` dump: `u32` width, `u32` height, then
/// `width * height` ARGB pixels, all big-endian.
pub fn decode_argb(bytes: &[u8], target: &mut [u32]) -> Result<DecodedImage> {
    let Some((header, body)) = bytes.split_first_chunk::<ARGB_HEADER_LEN>() else {
        return Err(RenderError::Decode(format!(
            "argb header needs {} bytes, got {}",
            ARGB_HEADER_LEN,
            bytes.len()
        )));
    };
    let width = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let height = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    let count = check_capacity(width, height, target)?;
    if body.len() < count * 4 {
        return Err(RenderError::Decode(format!(
            "argb body holds {} bytes, {}x{} needs {}",
            body.len(),
            width,
            height,
            count * 4
        )));
    }

    for (dst, chunk) in target[..count].iter_mut().zip(body.chunks_exact(4)) {
        *dst = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(DecodedImage {
        width,
        height,
        has_alpha_mask: true,
    })
}

/// Serialize pixels in the `.argb` layout read by [`decode_argb`].
pub fn encode_argb(width: u32, height: u32, pixels: &[u32]) -> Vec<u8> {
    let count = (width as usize * height as usize).min(pixels.len());
    let mut out = Vec::with_capacity(ARGB_HEADER_LEN + count * 4);
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    for px in &pixels[..count] {
        out.extend_from_slice(&px.to_be_bytes());
    }
    out
}

/// Inputs to the post-decode rescale and placeholder rules.
#[derive(Debug, Clone)]
pub struct LoadPolicy {
    pub profile: DeviceProfile,
    pub display_height: u32,
    pub placeholder: u32,
    /// Largest image the scratch buffer holds.
    pub max_width: u32,
    pub max_height: u32,
}

/// Load an image into `pixels` for slot `slot`.
///
/// Tries `path`, then `fallback`, skipping candidates that do not exist or
/// decode to nothing. When both fail, `pixels` is filled with a flat
/// placeholder sized by the device profile. The loaded image is then
/// rescaled per the profile:
/// - large covers: images at most half the max size are upscaled 2x
/// - dense grid: non-canvas images over the downscale limit are halved
///   until they fit
///
/// No rescaling happens on displays shorter than
/// `rescale_min_display_height`.
///
/// # Returns
/// The image geometry at `(0, 0)`. Missing files never produce an error;
/// only a placeholder that cannot fit `pixels` does.
pub fn load_image<I: ImageDecoder>(
    decoder: &I,
    policy: &LoadPolicy,
    slot: usize,
    path: &Path,
    fallback: Option<&Path>,
    pixels: &mut [u32],
) -> Result<Image> {
    let mut image = decode_first(decoder, [Some(path), fallback], pixels)
        .map(|decoded| Image {
            width: decoded.width,
            height: decoded.height,
            has_alpha_mask: decoded.has_alpha_mask,
            ..Image::default()
        })
        .map_or_else(|| placeholder(policy, slot, pixels), Ok)?;

    if policy.display_height < policy.profile.rescale_min_display_height {
        return Ok(image);
    }

    let profile = &policy.profile;
    if profile.is_large_covers()
        && image.width <= policy.max_width / 2
        && image.height <= policy.max_height / 2
    {
        upscale_2x(&mut image, pixels)?;
    }

    let limit = profile.downscale_limit;
    if profile.games_per_page == DeviceProfile::DENSE_GRID
        && slot != CANVAS_SLOT
        && (image.width > limit || image.height > limit)
    {
        downscale_pow2(&mut image, pixels, limit)?;
    }

    Ok(image)
}

fn decode_first<'a, I: ImageDecoder>(
    decoder: &I,
    candidates: impl IntoIterator<Item = Option<&'a Path>>,
    pixels: &mut [u32],
) -> Option<DecodedImage> {
    for path in candidates.into_iter().flatten() {
        if path.as_os_str().is_empty() || !path.exists() {
            debug!("load_image: {} does not exist", path.display());
            continue;
        }
        match decoder.decode(path, pixels) {
            Ok(decoded) if decoded.width > 0 && decoded.height > 0 => {
                debug!(
                    "load_image: {} is {}x{} mask={}",
                    path.display(),
                    decoded.width,
                    decoded.height,
                    decoded.has_alpha_mask
                );
                return Some(decoded);
            }
            Ok(_) => warn!("load_image: {} decoded to an empty image", path.display()),
            Err(e) => warn!("load_image: {}: {}", path.display(), e),
        }
    }
    None
}

fn placeholder(policy: &LoadPolicy, slot: usize, pixels: &mut [u32]) -> Result<Image> {
    let (width, height) = policy.profile.placeholder_size();
    let count = check_capacity(width, height, pixels)?;
    info!(
        "load_image: slot {} using {}x{} placeholder",
        slot, width, height
    );
    pixels[..count].fill(policy.placeholder);
    Ok(Image {
        width,
        height,
        has_alpha_mask: false,
        ..Image::default()
    })
}
