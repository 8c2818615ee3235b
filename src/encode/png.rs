//! Lossless PNG encoding via `image` (container) + `oxipng` (recompression).
//!
//! The quality parameter here is an *effort* level (0-9), not a perceptual
//! knob: PNG is always bit-exact lossless, so this module never reports a
//! non-zero diff score.

use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};
use oxipng::{Options, StripChunks};

use crate::error::{Error, Result};
use crate::raster::ReferenceRaster;

/// Encode `raster` as PNG, recompressed at oxipng effort `quality` (0-9).
///
/// # Errors
///
/// Returns [`Error::Encode`] if the container encode or oxipng pass fails.
pub fn encode(raster: &ReferenceRaster, quality: i32) -> Result<Vec<u8>> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(Error::Encode { format: "png", reason: "zero-size raster".into() });
    }

    let mut raw = Vec::new();
    let color = if raster.has_alpha() { ColorType::Rgba8 } else { ColorType::Rgb8 };
    PngEncoder::new(&mut raw)
        .write_image(raster.data(), raster.width(), raster.height(), color.into())
        .map_err(|e| Error::Encode { format: "png", reason: format!("container encode: {e}") })?;

    let effort = quality.clamp(0, 9) as u8;
    let mut options = Options::from_preset(effort);
    options.strip = StripChunks::Safe;

    oxipng::optimize_from_memory(&raw, &options)
        .map_err(|e| Error::Encode { format: "png", reason: format!("oxipng: {e}") })
}
