//! FFI bindings for the stability engine
//!
//! This module provides C-compatible functions for calling the engine from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `stability_free_string`.
//!
//! Analysis functions always answer with a response JSON (report or failure payload);
//! NULL is only returned for unusable arguments, with the reason in `stability_last_error`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::AnalyzerConfig;
use crate::encoder::ReportEncoder;
use crate::pipeline::{health, StabilityEngine};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Encode a payload and hand it to the caller, recording encoding failures
fn payload_to_cstr<T: serde::Serialize>(payload: &T) -> *mut c_char {
    match ReportEncoder::encode_to_json(payload) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze a single-analysis request JSON with default thresholds.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `stability_free_string`.
/// - Returns NULL on an invalid pointer; call `stability_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stability_analyze(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    payload_to_cstr(&StabilityEngine::new().analyze_json(&json_str))
}

/// Analyze a batch request JSON with default thresholds.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `stability_free_string`.
/// - Returns NULL on an invalid pointer; call `stability_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stability_batch_analyze(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    payload_to_cstr(&StabilityEngine::new().batch_analyze_json(&json_str))
}

/// Health payload JSON.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `stability_free_string`.
#[no_mangle]
pub unsafe extern "C" fn stability_health() -> *mut c_char {
    clear_last_error();
    payload_to_cstr(&health())
}

// ============================================================================
// Configured Engine API
// ============================================================================

/// Opaque handle to a StabilityEngine
pub struct StabilityEngineHandle {
    engine: StabilityEngine,
}

/// Create an engine from a configuration JSON (NULL for defaults).
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `stability_engine_free`.
/// - Returns NULL if the configuration cannot be parsed.
#[no_mangle]
pub unsafe extern "C" fn stability_engine_new(
    config_json: *const c_char,
) -> *mut StabilityEngineHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        AnalyzerConfig::default()
    } else {
        let config_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match AnalyzerConfig::from_json(&config_str) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&format!("Invalid config: {e}"));
                return ptr::null_mut();
            }
        }
    };

    let handle = Box::new(StabilityEngineHandle {
        engine: StabilityEngine::with_config(config),
    });
    Box::into_raw(handle)
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `stability_engine_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn stability_engine_free(engine: *mut StabilityEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Analyze a single-analysis request JSON with a configured engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `stability_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `stability_free_string`.
/// - Returns NULL on an invalid pointer; call `stability_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stability_engine_analyze(
    engine: *const StabilityEngineHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    payload_to_cstr(&handle.engine.analyze_json(&json_str))
}

/// Analyze a batch request JSON with a configured engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `stability_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `stability_free_string`.
/// - Returns NULL on an invalid pointer; call `stability_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stability_engine_batch_analyze(
    engine: *const StabilityEngineHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    payload_to_cstr(&handle.engine.batch_analyze_json(&json_str))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by a stability function.
///
/// # Safety
/// - `s` must be a pointer returned by a stability function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn stability_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next stability function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn stability_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the engine version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn stability_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
