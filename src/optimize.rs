//! Top-level orchestration: decode, consult the cache, search, record.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::cache::{Cache, CacheMeta, Fingerprint};
use crate::config::OptimizeOptions;
use crate::constraints::Constraints;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::metrics::PerceptionLevel;
use crate::{raster, search};

/// The result of one `optimize` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeOutcome {
    pub bytes: Vec<u8>,
    pub format: Format,
    pub quality: i32,
    pub diff_score: f64,
    pub passed: bool,
    pub perception: Option<PerceptionLevel>,
    /// Whether this result came from the cache without running a search.
    pub from_cache: bool,
}

/// Decode `input`, search for the smallest encoding across `options.formats`
/// that satisfies `options.max_bytes`/`options.max_diff`, and return the
/// winner. Transparently serves and populates the result cache.
///
/// # Errors
///
/// - [`Error::Decode`] if `input` is not a recognizable image.
/// - [`Error::AllFormatsFailed`] if every candidate format errored.
///
/// A constraints-satisfying miss is reported via `Ok` with
/// `OptimizeOutcome::passed == false`, matching the documented soft-failure
/// contract; callers that want that condition surfaced as an error can
/// check `passed` and map it to [`Error::NoCandidateMetConstraints`]
/// themselves.
#[instrument(skip(input), fields(input_len = input.len()))]
pub fn optimize(input: &[u8], options: &OptimizeOptions) -> Result<OptimizeOutcome> {
    let constraints = Constraints { max_bytes: options.max_bytes, max_diff: options.max_diff, metric: options.metric };
    let formats: Vec<Format> = if options.formats.is_empty() { Format::ALL.to_vec() } else { options.formats.clone() };

    let cache = if options.cache.enabled {
        Cache::new(options.cache.dir.clone(), options.cache.max_size_bytes)
    } else {
        Cache::disabled()
    };

    let key = Fingerprint::compute(input, options.max_bytes, options.max_diff, options.metric, &formats);

    if let Some(outcome) = try_cache_hit(&cache, key, &formats) {
        info!(format = %outcome.format, "optimize served from cache");
        return Ok(outcome);
    }

    let reference = raster::decode(input)?;
    let selection = search::run(&reference, &formats, constraints, options.worker_count)?;

    let candidate = &selection.candidate;
    cache.put(key, candidate.format, &candidate.bytes, CacheMeta::from_candidate(candidate));

    info!(
        format = %candidate.format,
        bytes = candidate.bytes_len(),
        passed = selection.passed,
        "optimize complete"
    );

    Ok(OptimizeOutcome {
        bytes: candidate.bytes.clone(),
        format: candidate.format,
        quality: candidate.quality,
        diff_score: candidate.score,
        passed: selection.passed,
        perception: perception_for(options.metric, candidate.score),
        from_cache: false,
    })
}

fn try_cache_hit(cache: &Cache, key: Fingerprint, formats: &[Format]) -> Option<OptimizeOutcome> {
    for &format in formats {
        if let Some((bytes, meta)) = cache.get(key, format) {
            return Some(OptimizeOutcome {
                bytes,
                format: meta.format,
                quality: meta.quality,
                diff_score: meta.diff_score,
                passed: meta.passed,
                perception: None,
                from_cache: true,
            });
        }
    }
    None
}

fn perception_for(metric: crate::metrics::MetricKind, score: f64) -> Option<PerceptionLevel> {
    matches!(metric, crate::metrics::MetricKind::Dssim).then(|| PerceptionLevel::from_dssim(score))
}

/// Strict variant of [`optimize`] that turns a constraints-unsatisfied
/// result into [`Error::NoCandidateMetConstraints`], for callers that want
/// the soft failure surfaced as an error rather than inspected on the
/// outcome.
pub fn optimize_strict(input: &[u8], options: &OptimizeOptions) -> Result<OptimizeOutcome> {
    let outcome = optimize(input, options)?;
    if outcome.passed { Ok(outcome) } else { Err(Error::NoCandidateMetConstraints) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use crate::metrics::MetricKind;

    fn solid_png(value: u8, width: u32, height: u32) -> Vec<u8> {
        let raster = crate::raster::ReferenceRaster::from_parts(
            vec![value; width as usize * height as usize * 3],
            width,
            height,
            3,
            Format::Png,
            None,
        );
        crate::encode::png::encode(&raster, 4).unwrap()
    }

    #[test]
    fn solid_gray_png_within_byte_budget() {
        let input = solid_png(128, 100, 100);
        let options = OptimizeOptions::builder()
            .max_bytes(10_000)
            .metric(MetricKind::None)
            .formats(vec![Format::Png, Format::Jpeg])
            .cache_disabled()
            .build();

        let outcome = optimize(&input, &options).unwrap();
        assert!(outcome.passed);
        assert!(outcome.bytes.len() <= 10_000);
        assert!(matches!(outcome.format, Format::Png | Format::Jpeg));
    }

    #[test]
    fn invalid_input_fails_to_decode() {
        let options = OptimizeOptions::builder().cache_disabled().build();
        let result = optimize(&[0x00, 0x01], &options);
        assert!(result.is_err());
    }

    #[test]
    fn unsatisfiable_constraints_yield_passed_false_not_an_error() {
        let input = solid_png(64, 50, 50);
        let options = OptimizeOptions::builder()
            .max_bytes(1)
            .metric(MetricKind::None)
            .formats(vec![Format::Png])
            .cache_disabled()
            .build();

        let outcome = optimize(&input, &options).unwrap();
        assert!(!outcome.passed);
        assert!(optimize_strict(&input, &options).is_err());
    }

    #[test]
    fn repeat_call_hits_cache_and_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let input = solid_png(200, 40, 40);
        let options = OptimizeOptions::builder()
            .metric(MetricKind::None)
            .formats(vec![Format::Png])
            .cache_dir(dir.path().to_path_buf())
            .build();

        let first = optimize(&input, &options).unwrap();
        assert!(!first.from_cache);

        let second = optimize(&input, &options).unwrap();
        assert!(second.from_cache);
        assert_eq!(second.bytes, first.bytes);
        assert_eq!(second.format, first.format);
    }
}
