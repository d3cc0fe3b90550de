//! Image materialization with an ordered fallback chain.
//!
//! `render_for` is total: every input yields a `size`×`size` RGBA canvas,
//! with `size` clamped to `1..=MAX_SIZE`.
//!
//! | Tier | When | Canvas |
//! |---|---|---|
//! | `Decoded` | standard decoder accepts the bytes | aspect-fit image centered on transparent |
//! | `UnsupportedFormat` | decoder rejects the bytes | red→yellow diagonal gradient, "RAW" |
//! | `CloudUnavailable` | no data or unexpected failure, cloud source | blue gradient, cloud glyph, "CLOUD" |
//! | `Generic` | no data or unexpected failure otherwise | gray, "?" |

use hfp_core::AlphaType;
use image::imageops::{self, FilterType};
use image::{GenericImageView, ImageError, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_ellipse_mut;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

use crate::glyphs::{draw_centered_label, GLYPH_HEIGHT};

const UNSUPPORTED_FROM: Rgba<u8> = Rgba([255, 0, 0, 255]);
const UNSUPPORTED_TO: Rgba<u8> = Rgba([255, 255, 0, 255]);
const CLOUD_FROM: Rgba<u8> = Rgba([0, 120, 215, 255]);
const CLOUD_TO: Rgba<u8> = Rgba([40, 160, 255, 255]);
const GENERIC_FILL: Rgba<u8> = Rgba([128, 128, 128, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Largest side length ever rendered.
pub const MAX_SIZE: u32 = 4096;

pub const UNSUPPORTED_LABEL: &str = "RAW";
pub const CLOUD_LABEL: &str = "CLOUD";
pub const GENERIC_LABEL: &str = "?";

/// Which fallback tier produced a thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTier {
    Decoded,
    UnsupportedFormat,
    CloudUnavailable,
    Generic,
}

/// A square RGBA thumbnail handed back to the host.
#[derive(Debug, Clone)]
pub struct RenderedThumbnail {
    pub image: RgbaImage,
    pub alpha: AlphaType,
    pub tier: RenderTier,
}

impl RenderedThumbnail {
    fn new(image: RgbaImage, tier: RenderTier) -> Self {
        RenderedThumbnail {
            image,
            alpha: AlphaType::Argb,
            tier,
        }
    }

    pub fn size(&self) -> u32 {
        self.image.width()
    }

    /// Pixels packed as straight `0xAARRGGBB`, row-major.
    pub fn argb_pixels(&self) -> Vec<u32> {
        self.image
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                u32::from_be_bytes([a, r, g, b])
            })
            .collect()
    }
}

/// Clamp a requested side length to `1..=MAX_SIZE`.
pub fn clamp_size(size: u32) -> u32 {
    size.clamp(1, MAX_SIZE)
}

enum Failure {
    /// Decoder could not make sense of the bytes
    Unrecognized(String),
    /// Anything else
    Unexpected(String),
}

/// Render without cloud context.
pub fn render(bytes: &[u8], size: u32) -> RenderedThumbnail {
    render_for(bytes, size, false)
}

/// Render `bytes` into a `size`×`size` thumbnail. `cloud` selects the
/// cloud-aware fallback for failures that are not format rejections.
pub fn render_for(bytes: &[u8], size: u32, cloud: bool) -> RenderedThumbnail {
    let size = clamp_size(size);

    if bytes.is_empty() {
        debug!("no image data");
        return fallback(size, cloud);
    }

    let attempt = panic::catch_unwind(AssertUnwindSafe(|| decode_and_fit(bytes, size)));
    match attempt {
        Ok(Ok(image)) => RenderedThumbnail::new(image, RenderTier::Decoded),
        Ok(Err(Failure::Unrecognized(reason))) => {
            info!("standard image format failed ({reason}), using unsupported-format placeholder");
            unsupported_format(size)
        }
        Ok(Err(Failure::Unexpected(reason))) => {
            warn!("error creating thumbnail: {reason}");
            fallback(size, cloud)
        }
        Err(_) => {
            warn!("image decoder panicked");
            fallback(size, cloud)
        }
    }
}

fn fallback(size: u32, cloud: bool) -> RenderedThumbnail {
    if cloud {
        info!("creating cloud-specific fallback thumbnail");
        cloud_unavailable(size)
    } else {
        generic(size)
    }
}

fn decode_and_fit(bytes: &[u8], size: u32) -> Result<RgbaImage, Failure> {
    let decoded = image::load_from_memory(bytes).map_err(|e| match e {
        // I/O errors from an in-memory reader can only mean truncated data
        ImageError::Unsupported(_) | ImageError::Decoding(_) | ImageError::IoError(_) => {
            Failure::Unrecognized(e.to_string())
        }
        other => Failure::Unexpected(other.to_string()),
    })?;

    let (w, h) = decoded.dimensions();
    if w == 0 || h == 0 {
        return Err(Failure::Unexpected(format!("degenerate image {w}x{h}")));
    }
    info!(width = w, height = h, "standard image format detected");

    Ok(fit_to_square(&decoded.to_rgba8(), size))
}

/// Target dimensions when fitting `w`×`h` into a `size` square: the larger
/// side becomes `size`, the other keeps the aspect ratio (at least 1 pixel).
pub fn fitted_dimensions(w: u32, h: u32, size: u32) -> (u32, u32) {
    let size64 = u64::from(size);
    if w > h {
        let nh = size64 * u64::from(h) / u64::from(w);
        (size, (nh as u32).max(1))
    } else {
        // height >= width, including square and degenerate inputs
        let nw = size64 * u64::from(w) / u64::from(h.max(1));
        ((nw as u32).clamp(1, size), size)
    }
}

/// Resize with bicubic filtering and center on a transparent square.
pub fn fit_to_square(source: &RgbaImage, size: u32) -> RgbaImage {
    let (nw, nh) = fitted_dimensions(source.width(), source.height(), size);
    let resized = imageops::resize(source, nw, nh, FilterType::CatmullRom);

    let mut canvas = RgbaImage::new(size, size);
    let x = (size - nw) / 2;
    let y = (size - nh) / 2;
    imageops::overlay(&mut canvas, &resized, i64::from(x), i64::from(y));
    canvas
}

/// 45° two-color gradient from the top-left to the bottom-right corner.
fn diagonal_gradient(size: u32, from: Rgba<u8>, to: Rgba<u8>) -> RgbaImage {
    let span = (2 * u64::from(size.saturating_sub(1))).max(1) as f32;
    RgbaImage::from_fn(size, size, |x, y| {
        let t = (u64::from(x) + u64::from(y)) as f32 / span;
        let mix = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
        Rgba([
            mix(from.0[0], to.0[0]),
            mix(from.0[1], to.0[1]),
            mix(from.0[2], to.0[2]),
            255,
        ])
    })
}

/// Data present, format not renderable.
pub fn unsupported_format(size: u32) -> RenderedThumbnail {
    let size = clamp_size(size);
    let mut canvas = diagonal_gradient(size, UNSUPPORTED_FROM, UNSUPPORTED_TO);

    let scale = (size / 8).max(8) / GLYPH_HEIGHT;
    let height = GLYPH_HEIGHT * scale.max(1);
    let y = (size as i32 - height as i32) / 2;
    draw_centered_label(&mut canvas, UNSUPPORTED_LABEL, y, scale, BLACK);

    RenderedThumbnail::new(canvas, RenderTier::UnsupportedFormat)
}

/// Cloud file whose content could not be used.
pub fn cloud_unavailable(size: u32) -> RenderedThumbnail {
    let size = clamp_size(size);
    let mut canvas = diagonal_gradient(size, CLOUD_FROM, CLOUD_TO);

    let s = size as i32;
    let cloud = s / 3;
    let x = (s - cloud) / 2;
    let y = (s - cloud) / 2 - s / 8;

    if cloud / 6 >= 1 {
        // Main body plus two side puffs
        draw_filled_ellipse_mut(&mut canvas, (x + cloud / 2, y + cloud / 4), cloud / 2, cloud / 4, WHITE);
        draw_filled_ellipse_mut(&mut canvas, (x, y + cloud / 3), cloud / 4, cloud / 6, WHITE);
        draw_filled_ellipse_mut(&mut canvas, (x + cloud * 3 / 4, y + cloud / 3), cloud / 4, cloud / 6, WHITE);
    }

    let scale = (size / 12).max(6) / GLYPH_HEIGHT;
    draw_centered_label(&mut canvas, CLOUD_LABEL, y + cloud / 2 + 5, scale, WHITE);

    RenderedThumbnail::new(canvas, RenderTier::CloudUnavailable)
}

/// Neutral "unknown" canvas.
pub fn generic(size: u32) -> RenderedThumbnail {
    let size = clamp_size(size);
    let mut canvas = RgbaImage::from_pixel(size, size, GENERIC_FILL);

    let scale = (size / 4) / GLYPH_HEIGHT;
    let height = GLYPH_HEIGHT * scale.max(1);
    let y = (size as i32 - height as i32) / 2;
    draw_centered_label(&mut canvas, GENERIC_LABEL, y, scale, WHITE);

    RenderedThumbnail::new(canvas, RenderTier::Generic)
}
