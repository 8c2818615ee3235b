//! JPEG encoding via `mozjpeg`.

use mozjpeg::{ColorSpace, Compress};

use crate::error::{Error, Result};
use crate::raster::ReferenceRaster;

/// Encode `raster` as a baseline JPEG at `quality` (1-100).
///
/// # Errors
///
/// Returns [`Error::Encode`] if the raster has zero dimensions or the
/// underlying compressor panics/fails.
pub fn encode(raster: &ReferenceRaster, quality: i32) -> Result<Vec<u8>> {
    let (width, height) = (raster.width() as usize, raster.height() as usize);
    if width == 0 || height == 0 {
        return Err(Error::Encode { format: "jpeg", reason: "zero-size raster".into() });
    }
    let rgb = raster.to_rgb8();
    let quality = quality.clamp(1, 100) as f32;

    let result = std::panic::catch_unwind(|| {
        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(width, height);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(quality);

        let mut comp = comp.start_compress(Vec::new()).map_err(|e| Error::Encode {
            format: "jpeg",
            reason: format!("start_compress: {e}"),
        })?;
        comp.write_scanlines(&rgb).map_err(|e| Error::Encode {
            format: "jpeg",
            reason: format!("write_scanlines: {e}"),
        })?;
        comp.finish().map_err(|e| Error::Encode { format: "jpeg", reason: format!("finish: {e}") })
    });

    match result {
        Ok(inner) => inner,
        Err(_) => Err(Error::Encode { format: "jpeg", reason: "encoder panicked".into() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    #[test]
    fn encodes_solid_raster() {
        let raster =
            ReferenceRaster::from_parts(vec![128u8; 8 * 8 * 3], 8, 8, 3, Format::Png, None);
        let bytes = encode(&raster, 80).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[0..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn quality_is_clamped_not_rejected() {
        let raster =
            ReferenceRaster::from_parts(vec![0u8; 4 * 4 * 3], 4, 4, 3, Format::Png, None);
        assert!(encode(&raster, 0).is_ok());
        assert!(encode(&raster, 200).is_ok());
    }
}
