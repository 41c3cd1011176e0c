//! C ABI for embedding the agent in a host app.
//!
//! Strings crossing the boundary are NUL-terminated UTF-8. Strings returned by
//! this library must be released with `beacon_free_string`.

use std::ffi::{CStr, CString, c_void};
use std::os::raw::c_char;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use beacon_agent::{
    AgentConfig, CompletionSink, DeliveryProgress, DeliveryTask, DeviceIdentityStore,
    PayloadFormat, PermissionProbe, fingerprint,
};
use beacon_db::SqlitePreferences;
use beacon_types::{DeliveryReport, EnvironmentSnapshot, Permission, RequestParameters};
use tracing::error;

/// Invoked once per dispatched request, on a runtime worker thread.
///
/// `message` is only valid for the duration of the call.
pub type CompletionCallback =
    extern "C" fn(user_data: *mut c_void, success: bool, message: *const c_char);

/// `payload_format` value for URL-encoded form bodies.
pub const BEACON_FORMAT_FORM: u8 = 0;
/// `payload_format` value for base64 JSON bodies.
pub const BEACON_FORMAT_COMPACT: u8 = 1;

/// Bits of `granted_permissions`.
pub const BEACON_PERMISSION_INTERNET: u32 = 1;
pub const BEACON_PERMISSION_ACCESS_WIFI_STATE: u32 = 2;

/// Permissions the host has already resolved, as a bitmask.
struct PermissionMask(u32);

impl PermissionProbe for PermissionMask {
    fn is_granted(&self, permission: Permission) -> bool {
        let bit = match permission {
            Permission::Internet => BEACON_PERMISSION_INTERNET,
            Permission::AccessWifiState => BEACON_PERMISSION_ACCESS_WIFI_STATE,
        };
        self.0 & bit != 0
    }
}

fn payload_format(code: u8) -> Option<PayloadFormat> {
    match code {
        BEACON_FORMAT_FORM => Some(PayloadFormat::Form),
        BEACON_FORMAT_COMPACT => Some(PayloadFormat::Compact),
        _ => None,
    }
}

/// Opaque handle returned to FFI callers.
pub struct SendHandle {
    progress: Arc<DeliveryProgress>,
}

type Handle = *mut SendHandle;

struct UserData(*mut c_void);

// The host owns `user_data` and guarantees it is usable from any thread.
unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

struct CallbackSink {
    callback: CompletionCallback,
    user_data: UserData,
}

impl CompletionSink for CallbackSink {
    fn complete(&self, report: DeliveryReport) {
        let message = to_c_string(report.message);
        (self.callback)(self.user_data.0, report.outcome.is_success(), message.as_ptr());
    }
}

// ── FFI helpers ─────────────────────────────────────────────────────────

unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> &'a str {
    if ptr.is_null() {
        return "";
    }
    unsafe { CStr::from_ptr(ptr).to_str().unwrap_or("") }
}

fn to_c_string(text: String) -> CString {
    CString::new(text.replace('\0', "")).unwrap_or_default()
}

fn into_raw_string(text: String) -> *mut c_char {
    to_c_string(text).into_raw()
}

fn runtime() -> Option<&'static tokio::runtime::Runtime> {
    static RUNTIME: OnceLock<Option<tokio::runtime::Runtime>> = OnceLock::new();
    RUNTIME
        .get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| error!("Failed to create Tokio runtime: {}", e))
                .ok()
        })
        .as_ref()
}

fn config_slot() -> &'static RwLock<Arc<AgentConfig>> {
    static CONFIG: OnceLock<RwLock<Arc<AgentConfig>>> = OnceLock::new();
    CONFIG.get_or_init(|| RwLock::new(Arc::new(AgentConfig::from_env())))
}

fn current_config() -> Arc<AgentConfig> {
    config_slot()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn open_identity(db_path: &str, namespace: &str) -> Option<DeviceIdentityStore<SqlitePreferences>> {
    let namespace = if namespace.is_empty() {
        current_config().prefs_namespace.clone()
    } else {
        namespace.to_string()
    };
    match SqlitePreferences::open(Path::new(db_path), &namespace) {
        Ok(prefs) => Some(DeviceIdentityStore::new(prefs)),
        Err(e) => {
            error!("Cannot open preferences at {}: {}", db_path, e);
            None
        }
    }
}

// ── FFI exports ─────────────────────────────────────────────────────────

/// Point subsequent sends at another collector.
///
/// # Safety
/// `base_url` must be a valid null-terminated UTF-8 C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn beacon_set_base_url(base_url: *const c_char) {
    let base_url = unsafe { cstr_to_str(base_url) };
    if base_url.is_empty() {
        return;
    }
    let mut slot = config_slot().write().unwrap_or_else(PoisonError::into_inner);
    let mut config = AgentConfig::clone(&slot);
    config.base_url = base_url.trim_end_matches('/').to_string();
    *slot = Arc::new(config);
}

/// Device identity, minted and persisted on first use.
///
/// Returns NULL if the preference database cannot be opened. An empty
/// `namespace` uses the configured default.
///
/// # Safety
/// All string pointers must be valid null-terminated UTF-8 C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn beacon_identity(
    db_path: *const c_char,
    namespace: *const c_char,
) -> *mut c_char {
    let db_path = unsafe { cstr_to_str(db_path) };
    let namespace = unsafe { cstr_to_str(namespace) };
    match open_identity(db_path, namespace) {
        Some(store) => into_raw_string(store.get_identity()),
        None => std::ptr::null_mut(),
    }
}

/// Fingerprint for a JSON-encoded environment snapshot.
///
/// Missing fields fall back to their sanitized placeholders. Returns NULL if
/// the JSON is malformed.
///
/// # Safety
/// `snapshot_json` must be a valid null-terminated UTF-8 C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn beacon_fingerprint(snapshot_json: *const c_char) -> *mut c_char {
    let json = unsafe { cstr_to_str(snapshot_json) };
    match serde_json::from_str::<EnvironmentSnapshot>(json) {
        Ok(snapshot) => into_raw_string(fingerprint::build(&snapshot)),
        Err(e) => {
            error!("Invalid environment snapshot: {}", e);
            std::ptr::null_mut()
        }
    }
}

/// Send one request in the background.
///
/// `params_json` is an object of string-or-null values; order is kept.
/// `payload_format` is `BEACON_FORMAT_FORM` or `BEACON_FORMAT_COMPACT`.
/// `granted_permissions` is an OR of `BEACON_PERMISSION_*` bits; without
/// `BEACON_PERMISSION_INTERNET` the send fails before any request is made.
/// `callback` receives the completion message exactly once. Returns NULL,
/// without calling back, if the parameters or format are malformed or no
/// runtime is available. Release the handle with `beacon_delivery_free`.
///
/// # Safety
/// All string pointers must be valid null-terminated UTF-8 C strings.
/// `user_data` must stay valid until the callback has run.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn beacon_send(
    path: *const c_char,
    params_json: *const c_char,
    success_message: *const c_char,
    failure_message: *const c_char,
    user_agent: *const c_char,
    payload_format_code: u8,
    granted_permissions: u32,
    callback: CompletionCallback,
    user_data: *mut c_void,
) -> Handle {
    let path = unsafe { cstr_to_str(path) }.to_string();
    let params_json = unsafe { cstr_to_str(params_json) };
    let success_message = unsafe { cstr_to_str(success_message) }.to_string();
    let failure_message = unsafe { cstr_to_str(failure_message) }.to_string();
    let user_agent = unsafe { cstr_to_str(user_agent) }.to_string();

    let params: RequestParameters = match serde_json::from_str(params_json) {
        Ok(params) => params,
        Err(e) => {
            error!(path = %path, "Invalid request parameters: {}", e);
            return std::ptr::null_mut();
        }
    };
    let Some(format) = payload_format(payload_format_code) else {
        error!(path = %path, "Unknown payload format: {}", payload_format_code);
        return std::ptr::null_mut();
    };
    let Some(rt) = runtime() else {
        return std::ptr::null_mut();
    };

    let task = DeliveryTask::new(current_config(), path)
        .success_message(success_message)
        .failure_message(failure_message)
        .user_agent(user_agent)
        .payload_format(format)
        .permissions(Arc::new(PermissionMask(granted_permissions)));
    let sink = Arc::new(CallbackSink {
        callback,
        user_data: UserData(user_data),
    });

    let handle = task.dispatch(rt.handle(), params, sink);
    Box::into_raw(Box::new(SendHandle {
        progress: handle.progress(),
    }))
}

/// Current state of a send: 0 created, 1 running, 2 succeeded, 3 failed.
///
/// # Safety
/// Handle must be a valid pointer returned by `beacon_send`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn beacon_delivery_state(handle: Handle) -> u8 {
    if handle.is_null() {
        return 0;
    }
    let send = unsafe { &*handle };
    send.progress.state() as u8
}

/// Free a send handle. The request itself keeps running.
///
/// # Safety
/// Handle must be a valid pointer returned by `beacon_send`, and must not be
/// used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn beacon_delivery_free(handle: Handle) {
    if !handle.is_null() {
        let _ = unsafe { Box::from_raw(handle) };
    }
}

/// Free a string returned by this library.
///
/// # Safety
/// `ptr` must come from this library and must not be used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn beacon_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    unsafe fn take_string(ptr: *mut c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        unsafe { beacon_free_string(ptr) };
        Some(text)
    }

    extern "C" fn record(user_data: *mut c_void, success: bool, message: *const c_char) {
        let tx = unsafe { &*(user_data as *const Mutex<mpsc::Sender<(bool, String)>>) };
        let message = unsafe { CStr::from_ptr(message) }.to_str().unwrap().to_string();
        tx.lock().unwrap().send((success, message)).unwrap();
    }

    #[test]
    fn fingerprint_from_json() {
        let json = CString::new(
            r#"{"package_name":"com.example","app_version":"1.0","device_model":"Pixel 7",
                "os_version":"34","locale":{"language":"en","country":"GB"},
                "screen_layout":18,"display":{"density_dpi":160,"width_pixels":1080,"height_pixels":2400}}"#,
        )
        .unwrap();
        let fp = unsafe { take_string(beacon_fingerprint(json.as_ptr())) }.unwrap();
        assert_eq!(
            fp,
            "com.example 1.0 phone Pixel7 android 34 en GB normal normal medium 1080 2400"
        );

        let bad = CString::new("{not json").unwrap();
        assert!(unsafe { beacon_fingerprint(bad.as_ptr()) }.is_null());
    }

    #[test]
    fn identity_is_stable_across_calls() {
        let dir = std::env::temp_dir().join(format!("beacon_ffi_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let db = CString::new(dir.join("prefs.db").to_str().unwrap()).unwrap();
        let ns = CString::new("").unwrap();

        let first = unsafe { take_string(beacon_identity(db.as_ptr(), ns.as_ptr())) }.unwrap();
        let second = unsafe { take_string(beacon_identity(db.as_ptr(), ns.as_ptr())) }.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, first.to_uppercase());
        assert_eq!(first.len(), 17);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn send_reports_failure_through_callback() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let base = CString::new(format!("http://127.0.0.1:{}", port)).unwrap();
        unsafe { beacon_set_base_url(base.as_ptr()) };

        let (tx, rx) = mpsc::channel::<(bool, String)>();
        let user_data = Box::into_raw(Box::new(Mutex::new(tx)));
        let path = CString::new("/startup").unwrap();
        let params = CString::new(r#"{"app_token":"abc","skipped":null}"#).unwrap();
        let ok = CString::new("Tracked session start").unwrap();
        let failed = CString::new("Failed to track session start").unwrap();
        let ua = CString::new("test-agent").unwrap();

        let handle = unsafe {
            beacon_send(
                path.as_ptr(),
                params.as_ptr(),
                ok.as_ptr(),
                failed.as_ptr(),
                ua.as_ptr(),
                BEACON_FORMAT_FORM,
                BEACON_PERMISSION_INTERNET | BEACON_PERMISSION_ACCESS_WIFI_STATE,
                record,
                user_data as *mut c_void,
            )
        };
        assert!(!handle.is_null());

        let (success, message) = rx.recv_timeout(Duration::from_secs(30)).unwrap();
        assert!(!success);
        assert!(message.starts_with("Failed to track session start ("));

        let state = unsafe { beacon_delivery_state(handle) };
        assert_eq!(state, 3);

        unsafe { beacon_delivery_free(handle) };
        drop(unsafe { Box::from_raw(user_data) });
    }

    #[test]
    fn malformed_params_return_null() {
        let path = CString::new("/event").unwrap();
        let params = CString::new("[1, 2]").unwrap();
        let empty = CString::new("").unwrap();
        let handle = unsafe {
            beacon_send(
                path.as_ptr(),
                params.as_ptr(),
                empty.as_ptr(),
                empty.as_ptr(),
                empty.as_ptr(),
                BEACON_FORMAT_FORM,
                BEACON_PERMISSION_INTERNET,
                record,
                std::ptr::null_mut(),
            )
        };
        assert!(handle.is_null());

        let params = CString::new("{}").unwrap();
        let handle = unsafe {
            beacon_send(
                path.as_ptr(),
                params.as_ptr(),
                empty.as_ptr(),
                empty.as_ptr(),
                empty.as_ptr(),
                7,
                BEACON_PERMISSION_INTERNET,
                record,
                std::ptr::null_mut(),
            )
        };
        assert!(handle.is_null());
    }

    #[test]
    fn missing_internet_grant_fails_without_sending() {
        let (tx, rx) = mpsc::channel::<(bool, String)>();
        let user_data = Box::into_raw(Box::new(Mutex::new(tx)));
        let path = CString::new("/event").unwrap();
        let params = CString::new(r#"{"a":"1"}"#).unwrap();
        let ok = CString::new("Tracked event").unwrap();
        let failed = CString::new("Failed to track event").unwrap();
        let ua = CString::new("test-agent").unwrap();

        let handle = unsafe {
            beacon_send(
                path.as_ptr(),
                params.as_ptr(),
                ok.as_ptr(),
                failed.as_ptr(),
                ua.as_ptr(),
                BEACON_FORMAT_COMPACT,
                BEACON_PERMISSION_ACCESS_WIFI_STATE,
                record,
                user_data as *mut c_void,
            )
        };
        assert!(!handle.is_null());

        let (success, message) = rx.recv_timeout(Duration::from_secs(30)).unwrap();
        assert!(!success);
        assert!(message.starts_with("Failed to track event ("));
        assert!(message.contains("INTERNET"));
        assert_eq!(unsafe { beacon_delivery_state(handle) }, 3);

        unsafe { beacon_delivery_free(handle) };
        drop(unsafe { Box::from_raw(user_data) });
    }

    #[test]
    fn permission_mask_maps_bits() {
        let mask = PermissionMask(BEACON_PERMISSION_ACCESS_WIFI_STATE);
        assert!(!mask.is_granted(Permission::Internet));
        assert!(mask.is_granted(Permission::AccessWifiState));
        assert_eq!(payload_format(BEACON_FORMAT_COMPACT), Some(PayloadFormat::Compact));
        assert_eq!(payload_format(2), None);
    }
}
