//! WebP encoding via the `webp` crate (libwebp bindings).

use webp::{Encoder, WebPConfig};

use crate::error::{Error, Result};
use crate::raster::ReferenceRaster;

/// Encode `raster` as lossy WebP at `quality` (0-100).
///
/// # Errors
///
/// Returns [`Error::Encode`] if the raster has zero dimensions or libwebp
/// refuses the configuration.
pub fn encode(raster: &ReferenceRaster, quality: i32) -> Result<Vec<u8>> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(Error::Encode { format: "webp", reason: "zero-size raster".into() });
    }

    let mut config = WebPConfig::new()
        .map_err(|()| Error::Encode { format: "webp", reason: "failed to build config".into() })?;
    config.quality = quality.clamp(0, 100) as f32;
    config.method = 4;

    let encoder = if raster.has_alpha() {
        Encoder::from_rgba(raster.data(), raster.width(), raster.height())
    } else {
        Encoder::from_rgb(raster.data(), raster.width(), raster.height())
    };

    let memory = encoder.encode_advanced(&config).map_err(|e| Error::Encode {
        format: "webp",
        reason: format!("{e:?}"),
    })?;

    Ok(memory.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    #[test]
    fn encodes_solid_raster() {
        let raster =
            ReferenceRaster::from_parts(vec![64u8; 8 * 8 * 3], 8, 8, 3, Format::Png, None);
        let bytes = encode(&raster, 75).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[0..4], b"RIFF");
    }

    #[test]
    fn encodes_rgba_raster() {
        let raster =
            ReferenceRaster::from_parts(vec![64u8, 64, 64, 200].repeat(16), 4, 4, 4, Format::Png, None);
        let bytes = encode(&raster, 50).unwrap();
        assert!(!bytes.is_empty());
    }
}
