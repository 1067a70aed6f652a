//! FFI bindings for Blink Morse
//!
//! This module lets a capture host written in another language drive the
//! decoder. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `bm_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use serde::Serialize;

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::morse::{decode_message, encode_message};
use crate::pipeline::BlinkDecoder;

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

/// Serialize a result to a C string, recording the error on failure
fn result_to_cstr<T: Serialize>(result: Result<T, DecodeError>) -> *mut c_char {
    match result.and_then(|value| serde_json::to_string(&value).map_err(DecodeError::from)) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Decoder API
// ============================================================================

/// Opaque handle to a BlinkDecoder
pub struct BlinkDecoderHandle {
    decoder: BlinkDecoder,
}

/// Create a decoder from a JSON configuration, or defaults if `config_json`
/// is NULL.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `bm_decoder_free`.
/// - Returns NULL on error; call `bm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bm_decoder_new(config_json: *const c_char) -> *mut BlinkDecoderHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        Ok(DecoderConfig::default())
    } else {
        match cstr_to_string(config_json) {
            Some(json) => DecoderConfig::from_json(&json),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match config.and_then(BlinkDecoder::new) {
        Ok(decoder) => Box::into_raw(Box::new(BlinkDecoderHandle { decoder })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a decoder.
///
/// # Safety
/// - `decoder` must be a valid pointer returned by `bm_decoder_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bm_decoder_free(decoder: *mut BlinkDecoderHandle) {
    if !decoder.is_null() {
        drop(Box::from_raw(decoder));
    }
}

/// Feed one eye-state sample; returns a JSON array of decoder events.
///
/// # Safety
/// - `decoder` must be a valid pointer returned by `bm_decoder_new`.
/// - Returns a newly allocated string that must be freed with `bm_free_string`.
/// - Returns NULL on error (e.g. a non-monotonic timestamp); the decoder is
///   unchanged and may keep being used.
#[no_mangle]
pub unsafe extern "C" fn bm_decoder_observe(
    decoder: *mut BlinkDecoderHandle,
    t_ms: f64,
    eyes_closed: bool,
) -> *mut c_char {
    clear_last_error();

    if decoder.is_null() {
        set_last_error("Null decoder pointer");
        return ptr::null_mut();
    }

    let handle = &mut *decoder;
    result_to_cstr(handle.decoder.observe(t_ms, eyes_closed))
}

/// Run an idle check; returns a JSON array of decoder events.
///
/// # Safety
/// - `decoder` must be a valid pointer returned by `bm_decoder_new`.
/// - Returns a newly allocated string that must be freed with `bm_free_string`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn bm_decoder_tick(decoder: *mut BlinkDecoderHandle, now_ms: f64) -> *mut c_char {
    clear_last_error();

    if decoder.is_null() {
        set_last_error("Null decoder pointer");
        return ptr::null_mut();
    }

    let handle = &mut *decoder;
    result_to_cstr(handle.decoder.tick(now_ms))
}

/// Get decoder counters as JSON.
///
/// # Safety
/// - `decoder` must be a valid pointer returned by `bm_decoder_new`.
/// - Returns a newly allocated string that must be freed with `bm_free_string`.
#[no_mangle]
pub unsafe extern "C" fn bm_decoder_stats(decoder: *const BlinkDecoderHandle) -> *mut c_char {
    clear_last_error();

    if decoder.is_null() {
        set_last_error("Null decoder pointer");
        return ptr::null_mut();
    }

    let handle = &*decoder;
    result_to_cstr(Ok(handle.decoder.stats()))
}

// ============================================================================
// Message API
// ============================================================================

/// Translate a Morse message (`"... --- ..."`) to text.
///
/// # Safety
/// - `morse` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `bm_free_string`.
#[no_mangle]
pub unsafe extern "C" fn bm_decode_message(morse: *const c_char) -> *mut c_char {
    clear_last_error();

    match cstr_to_string(morse) {
        Some(s) => string_to_cstr(&decode_message(&s)),
        None => {
            set_last_error("Invalid Morse string pointer");
            ptr::null_mut()
        }
    }
}

/// Translate text to a Morse message.
///
/// # Safety
/// - `text` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `bm_free_string`.
#[no_mangle]
pub unsafe extern "C" fn bm_encode_message(text: *const c_char) -> *mut c_char {
    clear_last_error();

    match cstr_to_string(text) {
        Some(s) => string_to_cstr(&encode_message(&s)),
        None => {
            set_last_error("Invalid text string pointer");
            ptr::null_mut()
        }
    }
}

/// Free a string returned by Blink Morse functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Blink Morse function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bm_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Blink Morse call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn bm_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn bm_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        bm_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_decoder_lifecycle() {
        let config = CString::new(r#"{"letter_gap_ms": 700}"#).unwrap();

        unsafe {
            let decoder = bm_decoder_new(config.as_ptr());
            assert!(!decoder.is_null());

            for (t, closed) in [(0.0, true), (4200.0, false), (4300.0, true), (4900.0, false)] {
                let events = take_string(bm_decoder_observe(decoder, t, closed));
                assert_eq!(events, "[]");
            }

            let events = take_string(bm_decoder_tick(decoder, 5700.0));
            let parsed: serde_json::Value = serde_json::from_str(&events).unwrap();
            assert_eq!(parsed[0]["event"], "letter_decoded");
            assert_eq!(parsed[0]["letter"], "T");

            let stats = take_string(bm_decoder_stats(decoder));
            let stats: serde_json::Value = serde_json::from_str(&stats).unwrap();
            assert_eq!(stats["dashes"], 1);
            assert_eq!(stats["letters"], 1);

            bm_decoder_free(decoder);
        }
    }

    #[test]
    fn test_ffi_default_config() {
        unsafe {
            let decoder = bm_decoder_new(ptr::null());
            assert!(!decoder.is_null());
            bm_decoder_free(decoder);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let bad_config = CString::new(r#"{"dot_max_ms": 9000}"#).unwrap();

        unsafe {
            let decoder = bm_decoder_new(bad_config.as_ptr());
            assert!(decoder.is_null());
            let error = CStr::from_ptr(bm_last_error()).to_str().unwrap();
            assert!(error.contains("Invalid configuration"));

            let decoder = bm_decoder_new(ptr::null());
            take_string(bm_decoder_observe(decoder, 100.0, false));
            let result = bm_decoder_observe(decoder, 50.0, true);
            assert!(result.is_null());
            let error = CStr::from_ptr(bm_last_error()).to_str().unwrap();
            assert!(error.contains("Invalid timestamp"));

            // Still usable after a rejected sample
            take_string(bm_decoder_observe(decoder, 150.0, true));
            bm_decoder_free(decoder);

            assert!(bm_decoder_tick(ptr::null_mut(), 0.0).is_null());
        }
    }

    #[test]
    fn test_ffi_messages() {
        let morse = CString::new("... --- ...").unwrap();
        let text = CString::new("sos").unwrap();

        unsafe {
            assert_eq!(take_string(bm_decode_message(morse.as_ptr())), "SOS");
            assert_eq!(take_string(bm_encode_message(text.as_ptr())), "... --- ...");
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = CStr::from_ptr(bm_version()).to_str().unwrap();
            assert_eq!(version, env!("CARGO_PKG_VERSION"));
        }
    }
}
