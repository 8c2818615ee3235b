//! Encoder primitives: one `encode(raster, quality) -> bytes` operation per
//! format, treated as pure, thread-safe, and re-entrant.

#[cfg(feature = "avif")]
pub mod avif;
#[cfg(feature = "jpeg")]
pub mod jpeg;
#[cfg(feature = "png")]
pub mod png;
#[cfg(feature = "webp")]
pub mod webp;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::Format;
use crate::raster::ReferenceRaster;

/// One encoded artifact produced during search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub format: Format,
    pub bytes: Vec<u8>,
    /// Raw (non-normalized) quality/effort parameter used to produce this
    /// candidate, in the format's own [`crate::format::QualityDomain`].
    pub quality: i32,
    /// Perceptual difference score against the reference, lower is better.
    /// Always `0.0` for lossless PNG or `MetricKind::None`.
    pub score: f64,
    pub passed: bool,
}

impl Candidate {
    #[must_use]
    pub fn bytes_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Encode `raster` at `quality` for `format`.
///
/// # Errors
///
/// Returns [`Error::Encode`] if the format's codec is not compiled in or
/// refuses this raster/quality combination.
pub fn encode(format: Format, raster: &ReferenceRaster, quality: i32) -> Result<Vec<u8>> {
    match format {
        #[cfg(feature = "jpeg")]
        Format::Jpeg => jpeg::encode(raster, quality),
        #[cfg(feature = "png")]
        Format::Png => png::encode(raster, quality),
        #[cfg(feature = "webp")]
        Format::WebP => webp::encode(raster, quality),
        #[cfg(feature = "avif")]
        Format::Avif => avif::encode(raster, quality),
        #[allow(unreachable_patterns)]
        _ => Err(Error::Encode { format: format.tag(), reason: "codec not compiled in".into() }),
    }
}

/// Decode a just-encoded candidate back into a raster for metric
/// evaluation. Delegates to [`crate::raster::decode`]; kept as a separate
/// entry point so search code reads as "encode, then decode-for-scoring"
/// rather than reusing the general decode path implicitly.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the freshly produced bytes fail to decode,
/// which indicates an encoder bug rather than bad input.
pub fn decode_for_scoring(bytes: &[u8]) -> Result<ReferenceRaster> {
    crate::raster::decode(bytes)
}
