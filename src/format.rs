//! Format detection and the closed `Format` enumeration.
//!
//! Magic-byte sniffing here mirrors the detection rules used by image
//! ingestion services in this lineage: a handful of fixed-offset byte
//! comparisons, no external crate needed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four formats the search engine knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    Jpeg,
    Png,
    WebP,
    Avif,
}

impl Format {
    /// All formats, in the engine's default search order.
    pub const ALL: [Format; 4] = [Format::Jpeg, Format::Png, Format::WebP, Format::Avif];

    /// Lowercase tag used in cache filenames and log fields.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::WebP => "webp",
            Format::Avif => "avif",
        }
    }

    /// Parse a tag as produced by [`Format::tag`]. Case-insensitive.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Format> {
        match tag.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Format::Jpeg),
            "png" => Some(Format::Png),
            "webp" => Some(Format::WebP),
            "avif" => Some(Format::Avif),
            _ => None,
        }
    }

    /// Whether this format is lossless (PNG) or searched via a lossy
    /// quality parameter (the other three).
    #[must_use]
    pub fn is_lossless(self) -> bool {
        matches!(self, Format::Png)
    }

    /// Inclusive quality-parameter domain for this format.
    ///
    /// For AVIF the domain is a quantizer: lower values mean *better*
    /// quality, the inverse of the other three. [`QualityDomain::normalize`]
    /// accounts for this so the search engine can treat "higher normalized
    /// value = better" uniformly.
    #[must_use]
    pub fn quality_domain(self) -> QualityDomain {
        match self {
            Format::Jpeg => QualityDomain { min: 1, max: 100, inverted: false },
            Format::WebP => QualityDomain { min: 0, max: 100, inverted: false },
            Format::Avif => QualityDomain { min: 0, max: 63, inverted: true },
            Format::Png => QualityDomain { min: 0, max: 9, inverted: false },
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The inclusive integer range a format's quality/effort parameter lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityDomain {
    pub min: i32,
    pub max: i32,
    /// True when a *lower* raw value means *better* quality (AVIF's
    /// quantizer scale).
    pub inverted: bool,
}

impl QualityDomain {
    /// Map a raw codec parameter onto a "higher normalized = better"
    /// integer scale the search engine's bisection logic can treat
    /// uniformly across formats.
    #[must_use]
    pub fn normalize(self, raw: i32) -> i32 {
        if self.inverted { self.max - raw } else { raw }
    }

    /// Inverse of [`QualityDomain::normalize`].
    #[must_use]
    pub fn denormalize(self, normalized: i32) -> i32 {
        if self.inverted { self.max - normalized } else { normalized }
    }

    #[must_use]
    pub fn normalized_min(self) -> i32 {
        self.normalize(if self.inverted { self.max } else { self.min })
    }

    #[must_use]
    pub fn normalized_max(self) -> i32 {
        self.normalize(if self.inverted { self.min } else { self.max })
    }
}

/// Sniff the format of encoded image bytes from fixed-offset magic bytes.
///
/// This tag is advisory only (used to annotate a decoded raster with its
/// origin); unrecognized input defaults to `jpeg` per the documented
/// detector contract, so callers that need to distinguish "unknown" from
/// "jpeg" should call [`crate::raster::decode`] and inspect its error
/// instead of relying on this function alone.
#[must_use]
pub fn detect_format(bytes: &[u8]) -> Format {
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        return Format::Jpeg;
    }
    if bytes.len() >= 4 && bytes[0..4] == [0x89, 0x50, 0x4E, 0x47] {
        return Format::Png;
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Format::WebP;
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return Format::Avif;
    }
    Format::Jpeg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_jpeg() {
        assert_eq!(detect_format(&[0xFF, 0xD8, 0xFF, 0xE0]), Format::Jpeg);
    }

    #[test]
    fn detects_png() {
        assert_eq!(detect_format(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]), Format::Png);
    }

    #[test]
    fn detects_webp() {
        let mut bytes = b"RIFF".to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(b"WEBP");
        assert_eq!(detect_format(&bytes), Format::WebP);
    }

    #[test]
    fn detects_avif() {
        let mut bytes = vec![0, 0, 0, 0x1C];
        bytes.extend_from_slice(b"ftypavif");
        assert_eq!(detect_format(&bytes), Format::Avif);
    }

    #[test]
    fn unknown_input_defaults_to_jpeg() {
        assert_eq!(detect_format(&[0x00, 0x01]), Format::Jpeg);
    }

    #[test]
    fn avif_domain_is_inverted() {
        let d = Format::Avif.quality_domain();
        assert_eq!(d.normalize(d.min), d.normalized_max());
        assert_eq!(d.normalize(d.max), d.normalized_min());
        assert_eq!(d.denormalize(d.normalize(17)), 17);
    }

    #[test]
    fn jpeg_domain_is_not_inverted() {
        let d = Format::Jpeg.quality_domain();
        assert_eq!(d.normalize(90), 90);
        assert_eq!(d.normalized_max(), 100);
    }

    #[test]
    fn tag_roundtrips_through_parse() {
        for fmt in Format::ALL {
            assert_eq!(Format::parse(fmt.tag()), Some(fmt));
        }
        assert_eq!(Format::parse("bogus"), None);
    }
}
