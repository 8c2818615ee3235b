//! # imgforge
//!
//! A constrained multi-format image optimization engine: given an input
//! image and optional size/perceptual-difference constraints, searches
//! across JPEG, WebP, AVIF (lossy) and PNG (lossless) encodings for the
//! smallest one that satisfies both, and memoizes the outcome in a
//! content-addressed filesystem cache.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use imgforge::{optimize, OptimizeOptions, MetricKind};
//!
//! let options = OptimizeOptions::builder()
//!     .max_bytes(50_000)
//!     .max_diff(0.01)
//!     .metric(MetricKind::Dssim)
//!     .build();
//!
//! let outcome = optimize(&input_bytes, &options)?;
//! # Ok::<(), imgforge::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`error`]: error taxonomy
//! - [`format`]: format tags and detection
//! - [`raster`]: decode and the reference-raster representation
//! - [`metrics`]: perceptual difference metrics (DSSIM, SSIMULACRA2)
//! - [`encode`]: per-format encoder primitives
//! - [`constraints`]: the size/diff threshold pair a candidate must satisfy
//! - [`search`]: the per-format bracket-and-bisect search engine
//! - [`cache`]: the bounded, content-addressed result cache
//! - [`config`]: per-call option builders
//! - [`optimize`]: the top-level orchestration entry point
//! - [`ffi`]: the C-ABI boundary

pub mod cache;
pub mod config;
pub mod constraints;
pub mod encode;
pub mod error;
pub mod ffi;
pub mod format;
pub mod metrics;
pub mod optimize;
pub mod raster;
pub mod search;

pub use config::{CacheConfig, OptimizeOptions, OptimizeOptionsBuilder};
pub use constraints::Constraints;
pub use encode::Candidate;
pub use error::{Error, MetricError, Result};
pub use format::{Format, detect_format};
pub use metrics::{MetricKind, PerceptionLevel};
pub use optimize::{OptimizeOutcome, optimize, optimize_strict};
pub use raster::{ReferenceRaster, decode};
pub use search::{FormatOutcome, Selection};
