//! The pair of optional thresholds a candidate must satisfy.

use serde::{Deserialize, Serialize};

use crate::encode::Candidate;
use crate::metrics::MetricKind;

/// Maximum acceptable output size and perceptual difference. Either may be
/// left unbounded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Constraints {
    pub max_bytes: Option<u64>,
    pub max_diff: Option<f64>,
    pub metric: MetricKind,
}

impl Constraints {
    #[must_use]
    pub fn unbounded(metric: MetricKind) -> Self {
        Self { max_bytes: None, max_diff: None, metric }
    }

    /// Whether `candidate` satisfies both thresholds. With
    /// `metric = MetricKind::None`, `max_diff` is ignored entirely.
    #[must_use]
    pub fn passes(&self, bytes: usize, score: f64) -> bool {
        let within_bytes = self.max_bytes.is_none_or(|max| bytes as u64 <= max);
        let within_diff =
            matches!(self.metric, MetricKind::None) || self.max_diff.is_none_or(|max| score <= max);
        within_bytes && within_diff
    }

    #[must_use]
    pub fn candidate_passes(&self, candidate: &Candidate) -> bool {
        self.passes(candidate.bytes_len(), candidate.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_always_passes() {
        let c = Constraints::unbounded(MetricKind::Dssim);
        assert!(c.passes(1_000_000, 1.0));
    }

    #[test]
    fn respects_byte_ceiling() {
        let c = Constraints { max_bytes: Some(1_000), max_diff: None, metric: MetricKind::Dssim };
        assert!(c.passes(999, 0.0));
        assert!(!c.passes(1_001, 0.0));
    }

    #[test]
    fn respects_diff_ceiling() {
        let c = Constraints { max_bytes: None, max_diff: Some(0.01), metric: MetricKind::Dssim };
        assert!(c.passes(1, 0.005));
        assert!(!c.passes(1, 0.02));
    }

    #[test]
    fn none_metric_ignores_diff_ceiling() {
        let c = Constraints { max_bytes: None, max_diff: Some(0.0), metric: MetricKind::None };
        assert!(c.passes(1, 999.0));
    }
}
