//! Error types for the optimization engine.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while optimizing an image.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Input bytes are not a recognizable, decodable image.
    #[error("decode failed: {reason}")]
    Decode {
        /// Reason the decoder rejected the input.
        reason: String,
    },

    /// A format-specific encoder refused the raster or a given quality.
    #[error("encode failed ({format}): {reason}")]
    Encode {
        /// Format tag of the encoder that failed.
        format: &'static str,
        /// Reason for the failure.
        reason: String,
    },

    /// A metric comparison could not be performed.
    #[error("metric error: {0}")]
    Metric(#[from] MetricError),

    /// Every candidate format errored out; no output could be produced.
    #[error("all candidate formats failed")]
    AllFormatsFailed,

    /// Every format produced output, but none satisfied the constraints.
    ///
    /// This is a soft failure: callers still receive the smallest
    /// non-passing candidate alongside `passed = false`.
    #[error("no candidate met constraints")]
    NoCandidateMetConstraints,

    /// The result cache could not be read or written. Never fatal; the
    /// caller proceeds as if the cache were disabled.
    #[error("cache I/O error: {0}")]
    CacheIo(String),

    /// Allocation failed. Fatal.
    #[error("out of memory")]
    OutOfMemory,

    /// I/O error wrapper, surfaced at the FFI boundary for cache paths.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error, used by the cache's `.meta` sidecars.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors specific to perceptual-metric evaluation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MetricError {
    /// Reference and candidate rasters disagree in width or height.
    #[error("dimension mismatch: reference {expected:?}, candidate {actual:?}")]
    Dimension {
        /// Reference raster dimensions (width, height).
        expected: (u32, u32),
        /// Candidate raster dimensions (width, height).
        actual: (u32, u32),
    },

    /// The metric implementation itself failed on well-formed input.
    #[error("{metric} calculation failed: {reason}")]
    Calculation {
        /// Name of the metric that failed.
        metric: &'static str,
        /// Reason reported by the metric implementation.
        reason: String,
    },
}
