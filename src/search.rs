//! The search engine: per-format quality search, run in parallel, then
//! cross-format selection.

use rayon::{ThreadPoolBuildError, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::constraints::Constraints;
use crate::encode::{self, Candidate};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::metrics::{self, MetricKind};
use crate::raster::ReferenceRaster;

/// Upper bound on total encode calls spent on one format's search, per the
/// bracket (≤7) + refinement (≤6) budget.
const MAX_ENCODE_CALLS_PER_FORMAT: u32 = 13;
const BRACKET_PROBES: usize = 6;
const MAX_REFINEMENT_STEPS: usize = 6;
const PNG_EFFORT_LEVELS: [i32; 2] = [4, 9];

/// The terminal state of one format's search.
#[derive(Debug, Clone)]
pub enum FormatOutcome {
    Complete(Candidate),
    Errored { format: Format, error: String },
}

/// Observable state of a single format's search, mirrored into tracing
/// spans as the search advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchState {
    Probing,
    Refining,
    Complete(bool),
    Errored,
}

/// The winning candidate across all searched formats, plus whether it
/// actually satisfied the constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub candidate: Candidate,
    pub passed: bool,
}

/// Run the per-format searches (in parallel, bounded worker pool) and pick
/// a winner.
///
/// `formats` is the user-supplied candidate list, in priority order for
/// tie-breaking; an empty list means "all four" per the documented
/// contract.
///
/// # Errors
///
/// Returns [`Error::AllFormatsFailed`] if every format errored, or
/// [`Error::NoCandidateMetConstraints`] if every format produced output but
/// none passed — in that case the smallest candidate is still attached to
/// the error's companion `Selection` via [`run`]'s `Ok` branch with
/// `passed = false` (this function never returns a selection-less soft
/// failure silently).
#[instrument(skip(reference), fields(worker_count))]
pub fn run(
    reference: &ReferenceRaster,
    formats: &[Format],
    constraints: Constraints,
    worker_count: usize,
) -> Result<Selection> {
    let formats: Vec<Format> = if formats.is_empty() { Format::ALL.to_vec() } else { formats.to_vec() };
    let worker_count = worker_count.clamp(1, 16);

    let pool = build_pool(worker_count)?;
    let outcomes: Vec<FormatOutcome> = pool.install(|| {
        formats
            .par_iter()
            .map(|&format| search_one_format(reference, format, constraints))
            .collect()
    });

    select_winner(&formats, outcomes)
}

fn build_pool(worker_count: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new().num_threads(worker_count).build().map_err(|e: ThreadPoolBuildError| {
        warn!(error = %e, "failed to build worker pool");
        Error::OutOfMemory
    })
}

#[instrument(skip(reference), fields(format = %format))]
fn search_one_format(reference: &ReferenceRaster, format: Format, constraints: Constraints) -> FormatOutcome {
    let result = if format.is_lossless() {
        search_lossless(reference, format, constraints)
    } else {
        search_lossy(reference, format, constraints)
    };

    match result {
        Ok(candidate) => FormatOutcome::Complete(candidate),
        Err(e) => {
            warn!(%format, error = %e, "format search errored");
            FormatOutcome::Errored { format, error: e.to_string() }
        }
    }
}

fn search_lossless(reference: &ReferenceRaster, format: Format, constraints: Constraints) -> Result<Candidate> {
    let mut best: Option<Candidate> = None;
    for &effort in &PNG_EFFORT_LEVELS {
        let bytes = encode::encode(format, reference, effort)?;
        let mut candidate = Candidate { format, bytes, quality: effort, score: 0.0, passed: false };
        candidate.passed = constraints.candidate_passes(&candidate);
        let passed = candidate.passed;
        let better = match &best {
            None => true,
            Some(b) => candidate_is_better(&candidate, b),
        };
        if better {
            best = Some(candidate);
        }
        if passed {
            break;
        }
    }
    best.ok_or_else(|| Error::Encode { format: format.tag(), reason: "no effort level produced output".into() })
}

fn probe_quality(
    reference: &ReferenceRaster,
    format: Format,
    domain: crate::format::QualityDomain,
    constraints: Constraints,
    normalized: i32,
) -> Result<Candidate> {
    let raw = domain.denormalize(normalized);
    let bytes = encode::encode(format, reference, raw)?;
    let score = if matches!(constraints.metric, MetricKind::None) {
        0.0
    } else {
        let decoded = encode::decode_for_scoring(&bytes)?;
        metrics::compare(reference, &decoded, constraints.metric)?
    };
    let mut candidate = Candidate { format, bytes, quality: raw, score, passed: false };
    candidate.passed = constraints.candidate_passes(&candidate);
    Ok(candidate)
}

fn search_lossy(reference: &ReferenceRaster, format: Format, constraints: Constraints) -> Result<Candidate> {
    let domain = format.quality_domain();
    let mut state = SearchState::Probing;
    let mut calls = 0u32;

    // Bracketing. `calls` is tracked against MAX_ENCODE_CALLS_PER_FORMAT so
    // the bound is visible even though the loop structure already respects
    // it by construction (BRACKET_PROBES + MAX_REFINEMENT_STEPS <= 13).
    let lo = domain.normalized_min();
    let hi = domain.normalized_max();
    let step = ((hi - lo) as f64 / (BRACKET_PROBES - 1) as f64).max(1.0);
    let mut probes: Vec<(i32, Candidate)> = Vec::with_capacity(BRACKET_PROBES);
    for i in 0..BRACKET_PROBES {
        let normalized = (lo as f64 + step * i as f64).round() as i32;
        let normalized = normalized.clamp(lo, hi);
        if probes.iter().any(|(n, _)| *n == normalized) {
            continue;
        }
        let candidate = probe_quality(reference, format, domain, constraints, normalized)?;
        calls += 1;
        debug!(normalized, bytes = candidate.bytes_len(), score = candidate.score, passed = candidate.passed, "bracket probe");
        probes.push((normalized, candidate));
    }
    probes.sort_by_key(|(n, _)| *n);

    // Refinement: find the top of the passing region and bisect toward it.
    state = SearchState::Refining;
    let passing_top = probes.iter().filter(|(_, c)| c.passed).map(|(n, _)| *n).max();

    let mut best: Option<Candidate> = probes
        .iter()
        .filter(|(_, c)| c.passed)
        .map(|(_, c)| c.clone())
        .reduce(|a, b| if candidate_is_better(&b, &a) { b } else { a });

    if let Some(low_n) = passing_top {
        let next_above = probes.iter().map(|(n, _)| *n).find(|n| *n > low_n);
        if let Some(mut high) = next_above {
            let mut low = low_n;
            let mut steps = 0usize;
            while high - low > 1 && steps < MAX_REFINEMENT_STEPS && calls < MAX_ENCODE_CALLS_PER_FORMAT {
                let mid = low + (high - low) / 2;
                let candidate = probe_quality(reference, format, domain, constraints, mid)?;
                calls += 1;
                debug!(normalized = mid, bytes = candidate.bytes_len(), passed = candidate.passed, "refinement probe");
                if candidate.passed {
                    if best.as_ref().is_none_or(|b| candidate_is_better(&candidate, b)) {
                        best = Some(candidate);
                    }
                    low = mid;
                } else {
                    high = mid;
                }
                steps += 1;
            }
        }
    } else {
        // Nothing passed during bracketing; refine toward smaller bytes
        // among the non-passing probes so the caller still sees our best
        // attempt when the format ultimately loses the cross-format vote.
        best = probes.iter().map(|(_, c)| c.clone()).reduce(|a, b| if candidate_is_better(&b, &a) { b } else { a });
    }

    state = SearchState::Complete(best.as_ref().is_some_and(|c| c.passed));
    debug!(?state, calls, "format search complete");

    best.ok_or_else(|| Error::Encode { format: format.tag(), reason: "bracketing produced no candidates".into() })
}

/// Tie-break order: passes > smaller bytes > lower score > higher raw
/// quality. `a` is "better" than `b` when this returns true.
fn candidate_is_better(a: &Candidate, b: &Candidate) -> bool {
    if a.passed != b.passed {
        return a.passed;
    }
    if a.bytes_len() != b.bytes_len() {
        return a.bytes_len() < b.bytes_len();
    }
    if (a.score - b.score).abs() > f64::EPSILON {
        return a.score < b.score;
    }
    a.quality > b.quality
}

fn select_winner(formats: &[Format], outcomes: Vec<FormatOutcome>) -> Result<Selection> {
    let mut candidates = Vec::new();
    let mut all_errored = true;
    for outcome in outcomes {
        match outcome {
            FormatOutcome::Complete(candidate) => {
                all_errored = false;
                candidates.push(candidate);
            }
            FormatOutcome::Errored { .. } => {}
        }
    }

    if all_errored || candidates.is_empty() {
        return Err(Error::AllFormatsFailed);
    }

    let winner = candidates
        .into_iter()
        .enumerate()
        .reduce(|(ai, a), (bi, b)| {
            if candidate_is_better(&b, &a) {
                (bi, b)
            } else if candidate_is_better(&a, &b) {
                (ai, a)
            } else {
                // True tie: prefer the format earlier in the caller's list.
                let a_rank = formats.iter().position(|&f| f == a.format).unwrap_or(usize::MAX);
                let b_rank = formats.iter().position(|&f| f == b.format).unwrap_or(usize::MAX);
                if b_rank < a_rank { (bi, b) } else { (ai, a) }
            }
        })
        .map(|(_, c)| c)
        .expect("candidates is non-empty");

    let passed = winner.passed;
    Ok(Selection { candidate: winner, passed })
}
