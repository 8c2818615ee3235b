//! C-ABI boundary.
//!
//! This module is the one place in the crate that deals in raw pointers.
//! Everything above this layer is ordinary safe Rust; everything below it
//! assumes a careful, conventional FFI caller (argument lifetimes honored,
//! `free_result` called exactly once per returned result).
//!
//! The teacher's upstream snapshot exposed a generic `free(ptr)` export
//! that was a no-op, alongside the real `free_result`. Any binding calling
//! the generic one leaked. This boundary drops that export entirely rather
//! than fix it to do something plausible-but-wrong; `free_result` is the
//! only release path.

use std::ffi::{CStr, CString, c_char};
use std::os::raw::c_int;
use std::ptr;
use std::slice;

use crate::config::OptimizeOptions;
use crate::format::Format;
use crate::metrics::MetricKind;

/// Mirrors [`crate::optimize::OptimizeOutcome`] as a stable-layout struct.
#[repr(C)]
pub struct FfiResult {
    pub data: *mut u8,
    pub data_len: usize,
    /// Heap-owned, NUL-terminated; always non-null (empty string on none).
    pub format: *mut c_char,
    pub diff_score: f64,
    pub passed: c_int,
    /// Heap-owned, NUL-terminated; empty string on success.
    pub error_message: *mut c_char,
}

#[repr(C)]
pub struct FfiOptions {
    pub input: *const u8,
    pub input_len: usize,
    /// 0 means unlimited.
    pub max_bytes: u64,
    /// 0.0 means unlimited.
    pub max_diff: f64,
    /// NUL-terminated; empty or null means the default metric (dssim).
    pub metric: *const c_char,
    /// NUL-terminated, comma-separated; empty or null means all four.
    pub formats: *const c_char,
    pub worker_count: usize,
    pub cache_enabled: c_int,
    /// NUL-terminated; empty or null means the platform default directory.
    pub cache_dir: *const c_char,
    /// 0 means the default (1 GiB).
    pub cache_max_bytes: u64,
}

/// Idempotent lifecycle hook. The engine holds no process-global state, so
/// this is a placeholder for codec libraries that expect one.
#[unsafe(no_mangle)]
pub extern "C" fn imgforge_init() -> c_int {
    0
}

/// Idempotent lifecycle hook; the counterpart to [`imgforge_init`].
#[unsafe(no_mangle)]
pub extern "C" fn imgforge_cleanup() -> c_int {
    0
}

/// Static, NUL-terminated version string. Caller must not free it.
#[unsafe(no_mangle)]
pub extern "C" fn imgforge_version() -> *const c_char {
    const VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr().cast()
}

/// Run one optimization job. Returns `null` only if `options` itself is
/// null or its input pointer/length are inconsistent; every other failure
/// is reported through the returned result's `error_message`.
///
/// # Safety
///
/// `options` must point to a valid, readable [`FfiOptions`]; its `input`
/// pointer must be valid for `input_len` bytes; its C-string fields must be
/// null or valid NUL-terminated UTF-8. The returned pointer must be passed
/// to [`imgforge_free_result`] exactly once and never read after that call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imgforge_optimize(options: *const FfiOptions) -> *mut FfiResult {
    if options.is_null() {
        return ptr::null_mut();
    }
    let options = unsafe { &*options };
    if options.input.is_null() {
        return ptr::null_mut();
    }
    let input = unsafe { slice::from_raw_parts(options.input, options.input_len) };

    let parsed = match parse_options(options) {
        Ok(parsed) => parsed,
        Err(message) => return Box::into_raw(Box::new(error_result(&message))),
    };

    match crate::optimize::optimize(input, &parsed) {
        Ok(outcome) => Box::into_raw(Box::new(success_result(&outcome))),
        Err(e) => Box::into_raw(Box::new(error_result(&e.to_string()))),
    }
}

/// Release a result previously returned by [`imgforge_optimize`].
///
/// # Safety
///
/// `result` must be a pointer returned by [`imgforge_optimize`], not
/// already freed, and not used again after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imgforge_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let boxed = unsafe { Box::from_raw(result) };
    if !boxed.data.is_null() {
        let _ = unsafe { Vec::from_raw_parts(boxed.data, boxed.data_len, boxed.data_len) };
    }
    if !boxed.format.is_null() {
        let _ = unsafe { CString::from_raw(boxed.format) };
    }
    if !boxed.error_message.is_null() {
        let _ = unsafe { CString::from_raw(boxed.error_message) };
    }
}

unsafe fn parse_options(options: &FfiOptions) -> Result<OptimizeOptions, String> {
    let metric = unsafe { opt_str(options.metric) }
        .map(|s| MetricKind::parse(&s).ok_or_else(|| format!("unknown metric: {s}")))
        .transpose()?
        .unwrap_or_default();

    let formats = match unsafe { opt_str(options.formats) } {
        None => Vec::new(),
        Some(s) if s.is_empty() => Vec::new(),
        Some(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|tag| Format::parse(tag).ok_or_else(|| format!("unknown format: {tag}")))
            .collect::<Result<Vec<_>, _>>()?,
    };

    let mut builder = OptimizeOptions::builder().metric(metric).formats(formats);
    if options.max_bytes > 0 {
        builder = builder.max_bytes(options.max_bytes);
    }
    if options.max_diff > 0.0 {
        builder = builder.max_diff(options.max_diff);
    }
    if options.worker_count > 0 {
        builder = builder.worker_count(options.worker_count);
    }
    if options.cache_enabled == 0 {
        builder = builder.cache_disabled();
    }
    if let Some(dir) = unsafe { opt_str(options.cache_dir) } {
        if !dir.is_empty() {
            builder = builder.cache_dir(std::path::PathBuf::from(dir));
        }
    }
    if options.cache_max_bytes > 0 {
        builder = builder.cache_max_size_bytes(options.cache_max_bytes);
    }

    Ok(builder.build())
}

unsafe fn opt_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok().map(str::to_owned)
}

fn success_result(outcome: &crate::optimize::OptimizeOutcome) -> FfiResult {
    let mut data = outcome.bytes.clone();
    data.shrink_to_fit();
    let data_len = data.len();
    let data_ptr = if data_len == 0 {
        ptr::null_mut()
    } else {
        let ptr = data.as_mut_ptr();
        std::mem::forget(data);
        ptr
    };

    // A soft failure (no candidate met constraints) is not success: the
    // data/format fields are still populated with the best attempt, but
    // error_message is non-empty so a caller checking it doesn't mistake
    // this for a clean pass.
    let message = if outcome.passed { "" } else { "No candidate met constraints" };

    FfiResult {
        data: data_ptr,
        data_len,
        format: CString::new(outcome.format.tag()).unwrap_or_default().into_raw(),
        diff_score: outcome.diff_score,
        passed: c_int::from(outcome.passed),
        error_message: CString::new(message).unwrap_or_default().into_raw(),
    }
}

fn error_result(message: &str) -> FfiResult {
    FfiResult {
        data: ptr::null_mut(),
        data_len: 0,
        format: CString::new("").unwrap_or_default().into_raw(),
        diff_score: 0.0,
        passed: 0,
        error_message: CString::new(message).unwrap_or_default().into_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_options_returns_null() {
        let result = unsafe { imgforge_optimize(ptr::null()) };
        assert!(result.is_null());
    }

    #[test]
    fn version_is_non_null_and_parseable() {
        let version = imgforge_version();
        assert!(!version.is_null());
        let s = unsafe { CStr::from_ptr(version) }.to_str().unwrap();
        assert!(!s.is_empty());
    }

    #[test]
    fn init_and_cleanup_are_idempotent() {
        assert_eq!(imgforge_init(), 0);
        assert_eq!(imgforge_init(), 0);
        assert_eq!(imgforge_cleanup(), 0);
        assert_eq!(imgforge_cleanup(), 0);
    }

    #[test]
    fn full_round_trip_through_the_boundary() {
        let raster = crate::raster::ReferenceRaster::from_parts(
            vec![77u8; 8 * 8 * 3],
            8,
            8,
            3,
            crate::format::Format::Png,
            None,
        );
        let png = crate::encode::png::encode(&raster, 4).unwrap();

        let options = FfiOptions {
            input: png.as_ptr(),
            input_len: png.len(),
            max_bytes: 0,
            max_diff: 0.0,
            metric: ptr::null(),
            formats: c"png".as_ptr(),
            worker_count: 1,
            cache_enabled: 0,
            cache_dir: ptr::null(),
            cache_max_bytes: 0,
        };

        let result = unsafe { imgforge_optimize(&options) };
        assert!(!result.is_null());
        unsafe {
            let r = &*result;
            assert_eq!(r.passed, 1);
            assert!(r.data_len > 0);
            imgforge_free_result(result);
        }
    }

    #[test]
    fn soft_failure_reports_passed_false_with_error_message() {
        let raster = crate::raster::ReferenceRaster::from_parts(
            vec![77u8; 8 * 8 * 3],
            8,
            8,
            3,
            crate::format::Format::Png,
            None,
        );
        let png = crate::encode::png::encode(&raster, 4).unwrap();

        let options = FfiOptions {
            input: png.as_ptr(),
            input_len: png.len(),
            // Unsatisfiable: forces every candidate to fail the constraint.
            max_bytes: 1,
            max_diff: 0.0,
            metric: ptr::null(),
            formats: c"png".as_ptr(),
            worker_count: 1,
            cache_enabled: 0,
            cache_dir: ptr::null(),
            cache_max_bytes: 0,
        };

        let result = unsafe { imgforge_optimize(&options) };
        assert!(!result.is_null());
        unsafe {
            let r = &*result;
            assert_eq!(r.passed, 0);
            let message = CStr::from_ptr(r.error_message).to_str().unwrap();
            assert_eq!(message, "No candidate met constraints");
            imgforge_free_result(result);
        }
    }
}
