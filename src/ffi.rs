//! FFI bindings for the ETL recorder
//!
//! This module provides C-compatible functions for embedding the recorder in a
//! host UI. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `etl_free_string`.
//!
//! The recorder handle stamps every event with its own monotonic clock, so
//! hosts forward events as they happen and never pass timestamps.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_double, c_int, c_longlong};
use std::ptr;

use serde::Deserialize;

use crate::clock::{Clock, MonotonicClock};
use crate::config::RecorderConfig;
use crate::encoder::SessionLogEncoder;
use crate::error::RecorderError;
use crate::recorder::SessionRecorder;
use crate::schema::Replayer;
use crate::types::{GazeSide, KeyEvent};

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

/// Config from an optional JSON string; NULL selects the defaults
unsafe fn parse_config(config_json: *const c_char) -> Result<RecorderConfig, RecorderError> {
    if config_json.is_null() {
        return Ok(RecorderConfig::default());
    }
    match cstr_to_string(config_json) {
        Some(json) => RecorderConfig::from_json(&json),
        None => Err(RecorderError::InvalidConfig(
            "config is not valid UTF-8".to_string(),
        )),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Replay a captured event stream (NDJSON or JSON array) and return the
/// session payload JSON.
///
/// # Safety
/// - `events` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `etl_free_string`.
/// - Returns NULL on error; call `etl_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn etl_replay(
    events: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let events_str = match cstr_to_string(events) {
        Some(s) => s,
        None => {
            set_last_error("Invalid events string pointer");
            return ptr::null_mut();
        }
    };

    let result = parse_config(config_json)
        .and_then(Replayer::new)
        .and_then(|replayer| replayer.replay_str(&events_str))
        .and_then(|log| SessionLogEncoder::new().encode_to_json(&log));

    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Recorder API
// ============================================================================

/// Opaque handle to a session recorder and its clock
pub struct EtlRecorderHandle {
    recorder: SessionRecorder,
    clock: MonotonicClock,
}

/// Key press as forwarded by the host, without a timestamp
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeystrokeInput {
    key: String,
    #[serde(default)]
    code: String,
    selection_start: usize,
    selection_end: usize,
    #[serde(rename = "textLen")]
    text_length: usize,
}

/// Create a recorder.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a pointer that must be freed with `etl_recorder_free`.
/// - Returns NULL on invalid configuration; call `etl_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn etl_recorder_new(config_json: *const c_char) -> *mut EtlRecorderHandle {
    clear_last_error();

    match parse_config(config_json) {
        Ok(config) => Box::into_raw(Box::new(EtlRecorderHandle {
            recorder: SessionRecorder::new(config),
            clock: MonotonicClock::new(),
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a recorder.
///
/// # Safety
/// - `recorder` must be a valid pointer returned by `etl_recorder_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn etl_recorder_free(recorder: *mut EtlRecorderHandle) {
    if !recorder.is_null() {
        drop(Box::from_raw(recorder));
    }
}

/// Start a session, optionally seeding the text baseline.
///
/// # Safety
/// - `recorder` must be a valid pointer returned by `etl_recorder_new`.
/// - `initial_text` must be a valid null-terminated C string or NULL.
/// - Returns 1 if a session was started, 0 if one was already running, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn etl_recorder_start(
    recorder: *mut EtlRecorderHandle,
    initial_text: *const c_char,
) -> c_int {
    clear_last_error();

    if recorder.is_null() {
        set_last_error("Null recorder pointer");
        return -1;
    }
    let handle = &mut *recorder;

    let text = cstr_to_string(initial_text).unwrap_or_default();
    let now = handle.clock.now_ms();
    c_int::from(handle.recorder.start_with_text(now, &text))
}

/// Record a key press from a JSON object
/// `{"key", "code", "selectionStart", "selectionEnd", "textLen"}`.
///
/// # Safety
/// - `recorder` must be a valid pointer returned by `etl_recorder_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 1 if recorded, 0 if no session is active, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn etl_recorder_record_keystroke(
    recorder: *mut EtlRecorderHandle,
    json: *const c_char,
) -> c_int {
    clear_last_error();

    if recorder.is_null() {
        set_last_error("Null recorder pointer");
        return -1;
    }
    let handle = &mut *recorder;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    let input: KeystrokeInput = match serde_json::from_str(&json_str) {
        Ok(input) => input,
        Err(e) => {
            set_last_error(&RecorderError::from(e).to_string());
            return -1;
        }
    };

    let event = KeyEvent {
        time: handle.clock.now_ms(),
        key: input.key,
        code: input.code,
        selection_start: input.selection_start,
        selection_end: input.selection_end,
        text_length: input.text_length,
    };
    c_int::from(handle.recorder.record_keystroke(event))
}

/// Record the current text of the writing widget.
///
/// # Safety
/// - `recorder` must be a valid pointer returned by `etl_recorder_new`.
/// - `text` must be a valid null-terminated C string.
/// - A negative `selection_start` means the cursor position is unknown.
/// - Returns 1 if the text changed, 0 if unchanged or no session is active,
///   -1 on error.
#[no_mangle]
pub unsafe extern "C" fn etl_recorder_record_text(
    recorder: *mut EtlRecorderHandle,
    text: *const c_char,
    selection_start: c_longlong,
) -> c_int {
    clear_last_error();

    if recorder.is_null() {
        set_last_error("Null recorder pointer");
        return -1;
    }
    let handle = &mut *recorder;

    let text_str = match cstr_to_string(text) {
        Some(s) => s,
        None => {
            set_last_error("Invalid text string pointer");
            return -1;
        }
    };

    let cursor = usize::try_from(selection_start).ok();
    let now = handle.clock.now_ms();
    c_int::from(
        handle
            .recorder
            .record_text_snapshot(now, &text_str, cursor)
            .is_some(),
    )
}

/// Record a gaze sample classified by the host.
///
/// # Safety
/// - `recorder` must be a valid pointer returned by `etl_recorder_new`.
/// - `side` must be "left", "right", "unknown", or NULL (unknown).
/// - Returns 1 if recorded, 0 if no session is active, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn etl_recorder_record_gaze(
    recorder: *mut EtlRecorderHandle,
    x: c_double,
    y: c_double,
    side: *const c_char,
) -> c_int {
    clear_last_error();

    if recorder.is_null() {
        set_last_error("Null recorder pointer");
        return -1;
    }
    let handle = &mut *recorder;

    let side = match cstr_to_string(side) {
        None => GazeSide::Unknown,
        Some(s) => match s.parse::<GazeSide>() {
            Ok(side) => side,
            Err(e) => {
                set_last_error(&e);
                return -1;
            }
        },
    };

    let now = handle.clock.now_ms();
    c_int::from(handle.recorder.record_gaze_sample(x, y, side, now))
}

/// Run one pause check. Hosts call this on a repeating timer.
///
/// # Safety
/// - `recorder` must be a valid pointer returned by `etl_recorder_new`.
/// - Returns 1 if this check opened a pause, 0 otherwise, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn etl_recorder_check_pause(recorder: *mut EtlRecorderHandle) -> c_int {
    clear_last_error();

    if recorder.is_null() {
        set_last_error("Null recorder pointer");
        return -1;
    }
    let handle = &mut *recorder;

    let now = handle.clock.now_ms();
    c_int::from(handle.recorder.check_pause(now))
}

/// Get the recorder status as JSON.
///
/// # Safety
/// - `recorder` must be a valid pointer returned by `etl_recorder_new`.
/// - Returns a newly allocated string that must be freed with `etl_free_string`.
/// - Returns NULL on error; call `etl_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn etl_recorder_status(recorder: *const EtlRecorderHandle) -> *mut c_char {
    clear_last_error();

    if recorder.is_null() {
        set_last_error("Null recorder pointer");
        return ptr::null_mut();
    }
    let handle = &*recorder;

    match serde_json::to_string(&handle.recorder.status()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Stop the session and return its payload JSON.
///
/// # Safety
/// - `recorder` must be a valid pointer returned by `etl_recorder_new`.
/// - Returns a newly allocated string that must be freed with `etl_free_string`.
/// - Returns NULL if no session is active or on error; call `etl_last_error`
///   to get the reason.
#[no_mangle]
pub unsafe extern "C" fn etl_recorder_stop(recorder: *mut EtlRecorderHandle) -> *mut c_char {
    clear_last_error();

    if recorder.is_null() {
        set_last_error("Null recorder pointer");
        return ptr::null_mut();
    }
    let handle = &mut *recorder;

    let now = handle.clock.now_ms();
    let Some(log) = handle.recorder.stop(now) else {
        set_last_error("No active session");
        return ptr::null_mut();
    };

    match SessionLogEncoder::new().encode_to_json(&log) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by recorder functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an `etl_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn etl_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next `etl_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn etl_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn etl_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
