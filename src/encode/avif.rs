//! AVIF encoding via `ravif` (safe, no libavif FFI needed for encode).
//!
//! Decode of AVIF inputs goes through `libavif-image` instead, since ravif
//! is encode-only; see [`crate::raster::decode`].

use ravif::{Encoder, Img, RGB8, RGBA8};

use crate::error::{Error, Result};
use crate::raster::ReferenceRaster;

/// Encode `raster` as AVIF at quantizer `quality` (0-63, lower is better).
///
/// # Errors
///
/// Returns [`Error::Encode`] if the raster has zero dimensions or the
/// encoder fails.
pub fn encode(raster: &ReferenceRaster, quality: i32) -> Result<Vec<u8>> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(Error::Encode { format: "avif", reason: "zero-size raster".into() });
    }
    let (width, height) = (raster.width() as usize, raster.height() as usize);

    // ravif's own scale is 0-100 "quality" (higher = better); convert from
    // the 0-63 quantizer domain declared in `Format::quality_domain`.
    let ravif_quality = (100.0 - (f64::from(quality) / 63.0) * 100.0).clamp(0.0, 100.0) as f32;

    let encoder = Encoder::new().with_quality(ravif_quality).with_speed(6);

    let encoded = if raster.has_alpha() {
        let pixels: Vec<RGBA8> = raster
            .data()
            .chunks_exact(4)
            .map(|p| RGBA8::new(p[0], p[1], p[2], p[3]))
            .collect();
        let img = Img::new(pixels.as_slice(), width, height);
        encoder.encode_rgba(img)
    } else {
        let pixels: Vec<RGB8> =
            raster.data().chunks_exact(3).map(|p| RGB8::new(p[0], p[1], p[2])).collect();
        let img = Img::new(pixels.as_slice(), width, height);
        encoder.encode_rgb(img)
    };

    let encoded = encoded.map_err(|e| Error::Encode { format: "avif", reason: format!("{e}") })?;
    Ok(encoded.avif_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    #[test]
    fn encodes_solid_raster() {
        let raster =
            ReferenceRaster::from_parts(vec![50u8; 8 * 8 * 3], 8, 8, 3, Format::Png, None);
        let bytes = encode(&raster, 32).unwrap();
        assert!(!bytes.is_empty());
    }
}
