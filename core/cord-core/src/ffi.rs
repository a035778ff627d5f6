//! C ABI for hosts that load the library directly (e.g. LuaJIT FFI).
//!
//! All symbols drive one process-wide engine. String arguments are borrowed
//! for the duration of the call only; null pointers read as empty strings.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use once_cell::sync::Lazy;

use crate::config::PresenceConfig;
use crate::context::DisplayTemplates;
use crate::engine::PresenceEngine;
use crate::logging::init_file_logging;

static ENGINE: Lazy<PresenceEngine> = Lazy::new(|| {
    let config = PresenceConfig::from_env();
    init_file_logging(&config);
    PresenceEngine::with_config(config)
});

/// Copies a borrowed C string, treating null as empty.
///
/// # Safety
///
/// `value` must be null or point to a NUL-terminated string valid for the
/// duration of the call.
unsafe fn c_str_arg(value: *const c_char) -> String {
    if value.is_null() {
        return String::new();
    }
    CStr::from_ptr(value).to_string_lossy().into_owned()
}

fn into_c_string(message: String) -> *mut c_char {
    // Interior NULs cannot cross the boundary; drop them.
    let sanitized: String = message.chars().filter(|c| *c != '\0').collect();
    CString::new(sanitized)
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

/// Starts a presence session.
///
/// Returns null on success, or an error message the caller must release
/// with [`free_string`].
///
/// # Safety
///
/// Every argument must be null or a valid NUL-terminated string.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn init(
    profile: *const c_char,
    icon: *const c_char,
    small: *const c_char,
    idle: *const c_char,
    viewing: *const c_char,
    editing: *const c_char,
    file_browser: *const c_char,
    plugin_manager: *const c_char,
    workspace: *const c_char,
) -> *mut c_char {
    let templates = DisplayTemplates {
        small_text: c_str_arg(small),
        idle_text: c_str_arg(idle),
        viewing_text: c_str_arg(viewing),
        editing_text: c_str_arg(editing),
        file_browser_text: c_str_arg(file_browser),
        plugin_manager_text: c_str_arg(plugin_manager),
        workspace_text: c_str_arg(workspace),
    };
    let icon = Some(c_str_arg(icon)).filter(|icon| !icon.is_empty());

    match ENGINE.initialize(c_str_arg(profile), icon, templates) {
        Some(message) => into_c_string(message),
        None => ptr::null_mut(),
    }
}

/// # Safety
///
/// `filename` and `filetype` must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn update_presence(
    filename: *const c_char,
    filetype: *const c_char,
    read_only: bool,
) -> bool {
    ENGINE.request_update(c_str_arg(filename), c_str_arg(filetype), read_only)
}

#[no_mangle]
pub extern "C" fn clear_presence() {
    ENGINE.clear_activity();
}

#[no_mangle]
pub extern "C" fn disconnect() {
    ENGINE.disconnect();
}

/// # Safety
///
/// `value` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn set_cwd(value: *const c_char) {
    ENGINE.set_working_directory(c_str_arg(value));
}

/// # Safety
///
/// `value` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn set_repository_url(value: *const c_char) {
    ENGINE.set_repository_url(c_str_arg(value));
}

#[no_mangle]
pub extern "C" fn set_time() {
    ENGINE.mark_activity_start();
}

/// Releases a string returned by [`init`].
///
/// # Safety
///
/// `value` must be null or a pointer previously returned by this library
/// that has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn free_string(value: *mut c_char) {
    if !value.is_null() {
        drop(CString::from_raw(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_invalid_utf8_arguments_are_tolerated() {
        unsafe {
            assert_eq!(c_str_arg(ptr::null()), "");
            let bytes = b"caf\xff\0";
            let value = c_str_arg(bytes.as_ptr() as *const c_char);
            assert_eq!(value, "caf\u{FFFD}");
        }
    }

    #[test]
    fn error_strings_round_trip_through_free() {
        let raw = into_c_string("bad\0value".to_string());
        assert!(!raw.is_null());
        unsafe {
            assert_eq!(CStr::from_ptr(raw).to_str().unwrap(), "badvalue");
            free_string(raw);
            free_string(ptr::null_mut());
        }
    }
}
