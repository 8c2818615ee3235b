//! Decoded pixel buffers.
//!
//! [`ReferenceRaster`] is the uncompressed ground truth every candidate is
//! measured against. JPEG decoding goes through `jpeg-decoder` directly (the
//! same crate the teacher codebase uses) so an embedded ICC profile can be
//! carried alongside the pixels; every other format decodes through the
//! `image` crate.

use crate::error::{Error, Result};
use crate::format::{Format, detect_format};

/// An uncompressed reference image: 8-bit-per-channel RGB or RGBA, packed
/// row-major with no padding (`stride == width * channels`).
#[derive(Debug, Clone)]
pub struct ReferenceRaster {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    origin_format: Format,
    /// Embedded ICC profile, if the source carried one. Advisory metadata
    /// only; it never influences pixel values or the search algorithm.
    icc_profile: Option<Vec<u8>>,
}

impl ReferenceRaster {
    /// Build a raster from already-decoded pixel data.
    ///
    /// # Panics
    ///
    /// Panics (debug-mode assertion) if `data.len()` disagrees with
    /// `width * height * channels`, or `channels` is not 3 or 4.
    #[must_use]
    pub fn from_parts(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        origin_format: Format,
        icc_profile: Option<Vec<u8>>,
    ) -> Self {
        debug_assert!(channels == 3 || channels == 4, "channels must be 3 or 4");
        debug_assert_eq!(data.len(), width as usize * height as usize * channels as usize);
        Self { data, width, height, channels, origin_format, icc_profile }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    #[must_use]
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    #[must_use]
    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    #[must_use]
    pub fn origin_format(&self) -> Format {
        self.origin_format
    }

    #[must_use]
    pub fn icc_profile(&self) -> Option<&[u8]> {
        self.icc_profile.as_deref()
    }

    /// Pixel data as RGB8, dropping alpha if present.
    #[must_use]
    pub fn to_rgb8(&self) -> Vec<u8> {
        if self.channels == 3 {
            return self.data.clone();
        }
        self.data
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()
    }
}

/// Decode arbitrary, possibly-untrusted image bytes into a
/// [`ReferenceRaster`].
///
/// # Errors
///
/// Returns [`Error::Decode`] if `bytes` is not a recognizable, valid image.
pub fn decode(bytes: &[u8]) -> Result<ReferenceRaster> {
    let format = detect_format(bytes);
    match format {
        #[cfg(feature = "jpeg")]
        Format::Jpeg => decode_jpeg(bytes),
        #[cfg(not(feature = "jpeg"))]
        Format::Jpeg => Err(Error::Decode { reason: "jpeg support not compiled in".into() }),

        #[cfg(feature = "png")]
        Format::Png => decode_via_image_crate(bytes, Format::Png),
        #[cfg(not(feature = "png"))]
        Format::Png => Err(Error::Decode { reason: "png support not compiled in".into() }),

        #[cfg(feature = "webp")]
        Format::WebP => decode_webp(bytes),
        #[cfg(not(feature = "webp"))]
        Format::WebP => Err(Error::Decode { reason: "webp support not compiled in".into() }),

        #[cfg(feature = "avif")]
        Format::Avif => decode_avif(bytes),
        #[cfg(not(feature = "avif"))]
        Format::Avif => Err(Error::Decode { reason: "avif support not compiled in".into() }),
    }
}

#[cfg(feature = "webp")]
fn decode_webp(bytes: &[u8]) -> Result<ReferenceRaster> {
    let decoded = webp::Decoder::new(bytes)
        .decode()
        .ok_or_else(|| Error::Decode { reason: "webp: decode failed".into() })?;
    let (width, height) = (decoded.width(), decoded.height());
    let channels = if decoded.is_alpha() { 4 } else { 3 };
    Ok(ReferenceRaster::from_parts(decoded.to_vec(), width, height, channels, Format::WebP, None))
}

#[cfg(feature = "avif")]
fn decode_avif(bytes: &[u8]) -> Result<ReferenceRaster> {
    let img = libavif_image::read(bytes).map_err(|e| Error::Decode { reason: format!("avif: {e}") })?;
    let (width, height) = (img.width(), img.height());
    if img.color().has_alpha() {
        let rgba = img.into_rgba8();
        Ok(ReferenceRaster::from_parts(rgba.into_raw(), width, height, 4, Format::Avif, None))
    } else {
        let rgb = img.into_rgb8();
        Ok(ReferenceRaster::from_parts(rgb.into_raw(), width, height, 3, Format::Avif, None))
    }
}

#[cfg(feature = "jpeg")]
fn decode_jpeg(bytes: &[u8]) -> Result<ReferenceRaster> {
    use jpeg_decoder::{Decoder, PixelFormat};
    use std::io::Cursor;

    let mut decoder = Decoder::new(Cursor::new(bytes));
    let pixels = decoder
        .decode()
        .map_err(|e| Error::Decode { reason: format!("jpeg: {e}") })?;
    let info = decoder
        .info()
        .ok_or_else(|| Error::Decode { reason: "jpeg: missing image info".into() })?;
    let icc_profile = decoder.icc_profile();

    let (rgb, channels) = match info.pixel_format {
        PixelFormat::RGB24 => (pixels, 3u8),
        PixelFormat::L8 => {
            let rgb = pixels.into_iter().flat_map(|l| [l, l, l]).collect();
            (rgb, 3)
        }
        PixelFormat::L16 => {
            return Err(Error::Decode { reason: "jpeg: 16-bit grayscale not supported".into() });
        }
        PixelFormat::CMYK32 => {
            return Err(Error::Decode { reason: "jpeg: CMYK not supported".into() });
        }
    };

    Ok(ReferenceRaster::from_parts(
        rgb,
        u32::from(info.width),
        u32::from(info.height),
        channels,
        Format::Jpeg,
        icc_profile,
    ))
}

#[cfg(feature = "png")]
fn decode_via_image_crate(bytes: &[u8], origin_format: Format) -> Result<ReferenceRaster> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::Decode { reason: format!("{origin_format}: {e}") })?;

    let (width, height) = (img.width(), img.height());
    if img.color().has_alpha() {
        let rgba = img.into_rgba8();
        Ok(ReferenceRaster::from_parts(rgba.into_raw(), width, height, 4, origin_format, None))
    } else {
        let rgb = img.into_rgb8();
        Ok(ReferenceRaster::from_parts(rgb.into_raw(), width, height, 3, origin_format, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_input() {
        let result = decode(&[0x00, 0x01]);
        assert!(result.is_err());
    }

    #[test]
    fn from_parts_round_trips_rgb() {
        let raster = ReferenceRaster::from_parts(
            vec![10, 20, 30, 40, 50, 60],
            2,
            1,
            3,
            Format::Png,
            None,
        );
        assert_eq!(raster.width(), 2);
        assert_eq!(raster.height(), 1);
        assert_eq!(raster.stride(), 6);
        assert!(!raster.has_alpha());
        assert_eq!(raster.to_rgb8(), vec![10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn to_rgb8_drops_alpha() {
        let raster = ReferenceRaster::from_parts(
            vec![10, 20, 30, 255, 40, 50, 60, 128],
            2,
            1,
            4,
            Format::Png,
            None,
        );
        assert_eq!(raster.to_rgb8(), vec![10, 20, 30, 40, 50, 60]);
    }
}
