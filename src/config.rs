//! Per-call configuration, following the builder pattern used throughout
//! this codebase's configuration surfaces.

use std::path::PathBuf;

use crate::cache::{self, DEFAULT_MAX_SIZE_BYTES};
use crate::format::Format;
use crate::metrics::MetricKind;

/// Cache behavior for one engine instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub max_size_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, dir: cache::default_cache_dir(), max_size_bytes: DEFAULT_MAX_SIZE_BYTES }
    }
}

/// Full set of options for one `optimize` call.
#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    pub max_bytes: Option<u64>,
    pub max_diff: Option<f64>,
    pub metric: MetricKind,
    pub formats: Vec<Format>,
    pub worker_count: usize,
    pub cache: CacheConfig,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            max_bytes: None,
            max_diff: None,
            metric: MetricKind::Dssim,
            formats: Vec::new(),
            worker_count: 4,
            cache: CacheConfig::default(),
        }
    }
}

impl OptimizeOptions {
    #[must_use]
    pub fn builder() -> OptimizeOptionsBuilder {
        OptimizeOptionsBuilder::default()
    }
}

/// Builder for [`OptimizeOptions`]. Every field falls back sensibly, so
/// `OptimizeOptionsBuilder::default().build()` is already a usable
/// (if permissive) configuration.
#[derive(Debug, Clone, Default)]
pub struct OptimizeOptionsBuilder {
    inner: OptimizeOptionsInner,
}

#[derive(Debug, Clone)]
struct OptimizeOptionsInner {
    max_bytes: Option<u64>,
    max_diff: Option<f64>,
    metric: MetricKind,
    formats: Vec<Format>,
    worker_count: usize,
    cache: CacheConfig,
}

impl Default for OptimizeOptionsInner {
    fn default() -> Self {
        let defaults = OptimizeOptions::default();
        Self {
            max_bytes: defaults.max_bytes,
            max_diff: defaults.max_diff,
            metric: defaults.metric,
            formats: defaults.formats,
            worker_count: defaults.worker_count,
            cache: defaults.cache,
        }
    }
}

impl OptimizeOptionsBuilder {
    #[must_use]
    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.inner.max_bytes = Some(max_bytes);
        self
    }

    #[must_use]
    pub fn max_diff(mut self, max_diff: f64) -> Self {
        self.inner.max_diff = Some(max_diff);
        self
    }

    #[must_use]
    pub fn metric(mut self, metric: MetricKind) -> Self {
        self.inner.metric = metric;
        self
    }

    #[must_use]
    pub fn formats(mut self, formats: Vec<Format>) -> Self {
        self.inner.formats = formats;
        self
    }

    #[must_use]
    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.inner.worker_count = worker_count.clamp(1, 16);
        self
    }

    #[must_use]
    pub fn cache_disabled(mut self) -> Self {
        self.inner.cache.enabled = false;
        self
    }

    #[must_use]
    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.inner.cache.dir = dir;
        self
    }

    #[must_use]
    pub fn cache_max_size_bytes(mut self, max_size_bytes: u64) -> Self {
        self.inner.cache.max_size_bytes = max_size_bytes;
        self
    }

    #[must_use]
    pub fn build(self) -> OptimizeOptions {
        OptimizeOptions {
            max_bytes: self.inner.max_bytes,
            max_diff: self.inner.max_diff,
            metric: self.inner.metric,
            formats: self.inner.formats,
            worker_count: self.inner.worker_count,
            cache: self.inner.cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_allow_all_formats() {
        let options = OptimizeOptions::default();
        assert!(options.formats.is_empty());
        assert_eq!(options.worker_count, 4);
    }

    #[test]
    fn builder_clamps_worker_count() {
        let options = OptimizeOptions::builder().worker_count(1000).build();
        assert_eq!(options.worker_count, 16);
    }

    #[test]
    fn builder_sets_fields() {
        let options = OptimizeOptions::builder()
            .max_bytes(5000)
            .max_diff(0.01)
            .metric(MetricKind::Ssimulacra2)
            .formats(vec![Format::Jpeg, Format::WebP])
            .cache_disabled()
            .build();
        assert_eq!(options.max_bytes, Some(5000));
        assert_eq!(options.max_diff, Some(0.01));
        assert_eq!(options.metric, MetricKind::Ssimulacra2);
        assert_eq!(options.formats, vec![Format::Jpeg, Format::WebP]);
        assert!(!options.cache.enabled);
    }
}
