//! Content-addressed, bounded filesystem cache of prior search outcomes.

pub mod fingerprint;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

pub use fingerprint::Fingerprint;

use crate::encode::Candidate;
use crate::error::Result;
use crate::format::Format;

/// Default cache budget: 1 GiB.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 1024 * 1024 * 1024;
/// Eviction target: stop once usage drops to this fraction of the budget.
const EVICTION_TARGET_RATIO: f64 = 0.90;

/// Metadata sidecar stored alongside each cached artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub format: Format,
    pub file_size: u64,
    pub quality: i32,
    pub diff_score: f64,
    pub passed: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub access_count: u64,
    /// Unix-epoch seconds of the most recent `get`; drives LRU eviction.
    pub last_access: u64,
}

impl CacheMeta {
    #[must_use]
    pub fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            format: candidate.format,
            file_size: candidate.bytes_len() as u64,
            quality: candidate.quality,
            diff_score: candidate.score,
            passed: candidate.passed,
            timestamp: chrono::Utc::now(),
            access_count: 0,
            last_access: now_epoch_secs(),
        }
    }
}

/// A bounded-size, filesystem-backed cache keyed by [`Fingerprint`].
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    max_size_bytes: u64,
    enabled: bool,
}

impl Cache {
    #[must_use]
    pub fn new(dir: PathBuf, max_size_bytes: u64) -> Self {
        Self { dir, max_size_bytes, enabled: true }
    }

    /// A cache that silently no-ops every operation, per the "disabled
    /// cache" contract: `put` does nothing, `get` is always a miss.
    #[must_use]
    pub fn disabled() -> Self {
        Self { dir: PathBuf::new(), max_size_bytes: 0, enabled: false }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Look up a cached artifact. Corrupt metadata, a missing artifact, or
    /// a format mismatch are all treated as a miss; stray files are
    /// best-effort removed rather than left to rot.
    #[instrument(skip(self), fields(key = %key))]
    pub fn get(&self, key: Fingerprint, expected_format: Format) -> Option<(Vec<u8>, CacheMeta)> {
        if !self.enabled {
            return None;
        }
        let meta_path = self.meta_path(key, expected_format);
        let artifact_path = self.artifact_path(key, expected_format);

        let mut meta: CacheMeta = match fs::read(&meta_path).ok().and_then(|raw| serde_json::from_slice(&raw).ok()) {
            Some(meta) => meta,
            None => return None,
        };
        if meta.format != expected_format {
            let _ = fs::remove_file(&meta_path);
            return None;
        }

        let bytes = match fs::read(&artifact_path) {
            Ok(bytes) => bytes,
            Err(_) => {
                let _ = fs::remove_file(&meta_path);
                return None;
            }
        };

        meta.access_count += 1;
        meta.last_access = now_epoch_secs();
        if let Ok(serialized) = serde_json::to_vec(&meta) {
            let _ = atomic_write(&meta_path, &serialized);
        }

        info!(bytes = bytes.len(), "cache hit");
        Some((bytes, meta))
    }

    /// Store an artifact and its metadata, then evict if the store is over
    /// budget. Cache I/O failures here are logged and swallowed per the
    /// documented error policy; they never propagate to the caller.
    #[instrument(skip(self, bytes), fields(key = %key, format = %format))]
    pub fn put(&self, key: Fingerprint, format: Format, bytes: &[u8], meta: CacheMeta) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.put_inner(key, format, bytes, &meta) {
            warn!(error = %e, "cache put failed, continuing as cache miss");
            return;
        }
        if let Err(e) = self.evict_if_needed() {
            warn!(error = %e, "cache eviction pass failed");
        }
    }

    fn put_inner(&self, key: Fingerprint, format: Format, bytes: &[u8], meta: &CacheMeta) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let artifact_path = self.artifact_path(key, format);
        let meta_path = self.meta_path(key, format);
        atomic_write(&artifact_path, bytes)?;
        atomic_write(&meta_path, &serde_json::to_vec(meta)?)?;
        Ok(())
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<()> {
        if !self.enabled || !self.dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let _ = fs::remove_file(entry.path());
        }
        Ok(())
    }

    fn artifact_path(&self, key: Fingerprint, format: Format) -> PathBuf {
        self.dir.join(format!("{}.{}", key.to_hex(), format.tag()))
    }

    fn meta_path(&self, key: Fingerprint, format: Format) -> PathBuf {
        self.dir.join(format!("{}.{}.meta", key.to_hex(), format.tag()))
    }

    /// Least-recently-accessed, then least-frequently-accessed, eviction
    /// until usage drops to [`EVICTION_TARGET_RATIO`] of the budget.
    fn evict_if_needed(&self) -> Result<()> {
        let mut entries = self.scan_entries()?;
        let mut total: u64 = entries.iter().map(|e| e.meta.file_size).sum();
        if total <= self.max_size_bytes {
            return Ok(());
        }

        entries.sort_by(|a, b| {
            a.meta
                .last_access
                .cmp(&b.meta.last_access)
                .then(a.meta.access_count.cmp(&b.meta.access_count))
        });

        let target = (self.max_size_bytes as f64 * EVICTION_TARGET_RATIO) as u64;
        for entry in entries {
            if total <= target {
                break;
            }
            let _ = fs::remove_file(&entry.artifact_path);
            let _ = fs::remove_file(&entry.meta_path);
            total = total.saturating_sub(entry.meta.file_size);
        }
        Ok(())
    }

    fn scan_entries(&self) -> Result<Vec<ScannedEntry>> {
        let mut entries = Vec::new();
        if !self.dir.exists() {
            return Ok(entries);
        }
        for dir_entry in fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("meta") {
                continue;
            }
            let Ok(raw) = fs::read(&path) else { continue };
            let Ok(meta) = serde_json::from_slice::<CacheMeta>(&raw) else { continue };
            let artifact_path = artifact_path_for_meta(&path);
            entries.push(ScannedEntry { meta, meta_path: path, artifact_path });
        }
        Ok(entries)
    }
}

struct ScannedEntry {
    meta: CacheMeta,
    meta_path: PathBuf,
    artifact_path: PathBuf,
}

fn artifact_path_for_meta(meta_path: &Path) -> PathBuf {
    let stem = meta_path.to_string_lossy();
    PathBuf::from(stem.strip_suffix(".meta").unwrap_or(&stem).to_string())
}

/// Write via a temp file in the same directory, then rename, so readers
/// never observe a partially written file.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    use std::io::Write;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn now_epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Resolve the platform default cache directory:
/// `$XDG_CACHE_HOME/imgforge` or `$HOME/.cache/imgforge`.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("imgforge");
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".cache").join("imgforge");
    }
    PathBuf::from(".imgforge-cache")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricKind;

    fn sample_candidate() -> Candidate {
        Candidate { format: Format::Png, bytes: vec![1, 2, 3, 4], quality: 4, score: 0.0, passed: true }
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), DEFAULT_MAX_SIZE_BYTES);
        let key = Fingerprint::compute(b"input", None, None, MetricKind::None, &[Format::Png]);
        let candidate = sample_candidate();
        cache.put(key, Format::Png, &candidate.bytes, CacheMeta::from_candidate(&candidate));

        let (bytes, meta) = cache.get(key, Format::Png).expect("expected cache hit");
        assert_eq!(bytes, candidate.bytes);
        assert_eq!(meta.format, Format::Png);
        assert_eq!(meta.access_count, 1);
    }

    #[test]
    fn miss_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), DEFAULT_MAX_SIZE_BYTES);
        let key = Fingerprint::compute(b"missing", None, None, MetricKind::None, &[]);
        assert!(cache.get(key, Format::Jpeg).is_none());
    }

    #[test]
    fn disabled_cache_never_stores_or_hits() {
        let cache = Cache::disabled();
        let key = Fingerprint::compute(b"input", None, None, MetricKind::None, &[]);
        let candidate = sample_candidate();
        cache.put(key, Format::Png, &candidate.bytes, CacheMeta::from_candidate(&candidate));
        assert!(cache.get(key, Format::Png).is_none());
    }

    #[test]
    fn clear_removes_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), DEFAULT_MAX_SIZE_BYTES);
        let key = Fingerprint::compute(b"input", None, None, MetricKind::None, &[]);
        let candidate = sample_candidate();
        cache.put(key, Format::Png, &candidate.bytes, CacheMeta::from_candidate(&candidate));
        cache.clear().unwrap();
        assert!(cache.get(key, Format::Png).is_none());
    }

    #[test]
    fn eviction_keeps_usage_under_budget() {
        let dir = tempfile::tempdir().unwrap();
        // Tiny budget so a handful of small entries forces eviction.
        let cache = Cache::new(dir.path().to_path_buf(), 32);
        for i in 0..8u8 {
            let key = Fingerprint::compute(&[i], None, None, MetricKind::None, &[]);
            let bytes = vec![i; 16];
            let candidate = Candidate { format: Format::Png, bytes: bytes.clone(), quality: 4, score: 0.0, passed: true };
            cache.put(key, Format::Png, &bytes, CacheMeta::from_candidate(&candidate));
        }
        let total: u64 = cache.scan_entries().unwrap().iter().map(|e| e.meta.file_size).sum();
        assert!(total <= 32, "expected eviction to keep total <= budget, got {total}");
    }

    #[test]
    fn null_vs_zero_max_bytes_are_distinct_cache_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), DEFAULT_MAX_SIZE_BYTES);
        let null_key = Fingerprint::compute(b"same", None, None, MetricKind::None, &[]);
        let zero_key = Fingerprint::compute(b"same", Some(0), None, MetricKind::None, &[]);

        let candidate = sample_candidate();
        cache.put(null_key, Format::Png, &candidate.bytes, CacheMeta::from_candidate(&candidate));
        assert!(cache.get(zero_key, Format::Png).is_none());
    }
}
