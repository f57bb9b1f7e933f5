//! FFI bindings for the adaptive metabolism engine
//!
//! This module provides C-compatible functions for calling the engine from
//! mobile and other host languages. All functions take and return JSON in
//! null-terminated C strings; returned memory must be freed by the caller
//! using `metabolic_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::Utc;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::pipeline::{coach_with_config, estimate_request};
use crate::request::EstimationRequest;
use crate::types::{MetabolicEstimate, UserProfile};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

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

/// Optional config pointer: NULL means defaults
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<EngineConfig, EngineError> {
    if config_json.is_null() {
        return Ok(EngineConfig::default());
    }
    let json = cstr_to_string(config_json)
        .ok_or_else(|| EngineError::ParseError("Invalid config string pointer".to_string()))?;
    EngineConfig::from_json(&json)
}

/// Turn an engine result into an owned C string, recording any error
fn finish(result: Result<String, EngineError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Run one estimation cycle and return the estimate as JSON.
///
/// # Safety
/// - `request_json` must be a valid null-terminated C string holding an
///   estimation request (profile, weights, intakes, optional previous).
/// - `config_json` may be NULL (defaults) or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `metabolic_free_string`.
/// - Returns NULL on error; call `metabolic_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn metabolic_estimate_json(
    request_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let request_str = match cstr_to_string(request_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid request string pointer");
            return ptr::null_mut();
        }
    };

    let result = config_from_ptr(config_json).and_then(|config| {
        let request = EstimationRequest::from_json(&request_str)?;
        estimate_request(&request, &config, Utc::now())?.to_json()
    });
    finish(result)
}

/// Produce weekly coaching for an estimate and return it as JSON.
///
/// # Safety
/// - `estimate_json` and `profile_json` must be valid null-terminated C strings.
/// - `config_json` may be NULL (defaults) or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `metabolic_free_string`.
/// - Returns NULL on error; call `metabolic_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn metabolic_coach_json(
    estimate_json: *const c_char,
    profile_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let estimate_str = match cstr_to_string(estimate_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid estimate string pointer");
            return ptr::null_mut();
        }
    };

    let profile_str = match cstr_to_string(profile_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid profile string pointer");
            return ptr::null_mut();
        }
    };

    let result = config_from_ptr(config_json).and_then(|config| {
        let estimate = MetabolicEstimate::from_json(&estimate_str)?;
        let profile: UserProfile = serde_json::from_str(&profile_str)?;
        let coaching = coach_with_config(&estimate, &profile, &config)?;
        serde_json::to_string(&coaching).map_err(|e| EngineError::EncodingError(e.to_string()))
    });
    finish(result)
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a static string that is valid until the next FFI call.
/// - Do NOT free this pointer.
/// - Returns NULL if there was no error.
#[no_mangle]
pub unsafe extern "C" fn metabolic_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(s) => s.as_ptr(),
        None => ptr::null(),
    })
}

/// Free a string returned by engine functions.
///
/// # Safety
/// - `s` must be a pointer returned by an engine function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn metabolic_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
