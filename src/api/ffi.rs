//! C-compatible entry points for a model-hosting runtime.
//!
//! The host calls `booksales_init` once, then `booksales_run` per request.
//! Strings returned by Rust must be released with `booksales_free_str`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use tracing::{error, info};

use crate::common::config::AppCfg;
use crate::common::error::{ErrorCode, SalesError, SalesResult};
use crate::common::log;
use crate::inference::domain::ScoreResponse;
use crate::inference::service::Scorer;

static SCORER: Lazy<RwLock<Option<Scorer>>> = Lazy::new(|| RwLock::new(None));

const FALLBACK_JSON: &str = r#"{"error":"internal error"}"#;

/// ABI version to coordinate with the host.
#[no_mangle]
pub extern "C" fn booksales_api_version() -> u32 {
    1
}

/// Load a registered model.
///
/// A null or empty `model_name` uses the configured default; `version == 0`
/// selects the latest version. Returns an [`ErrorCode`] as `u32`.
///
/// # Safety
/// `model_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn booksales_init(model_name: *const c_char, version: u32) -> u32 {
    let name = if model_name.is_null() {
        None
    } else {
        Some(CStr::from_ptr(model_name).to_string_lossy().into_owned())
    };
    let version = (version != 0).then_some(version);

    match init_scorer(name, version) {
        Ok(()) => ErrorCode::Ok as u32,
        Err(err) => {
            error!(ev = "ffi_init_failed", error = %err);
            err.code() as u32
        }
    }
}

fn init_scorer(name: Option<String>, version: Option<u32>) -> SalesResult<()> {
    let mut cfg = AppCfg::load()?;
    log::init(&cfg);
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        cfg.model_name = name;
    }

    let scorer = Scorer::init(&cfg, version)?;
    if let Some(model) = scorer.model() {
        info!(ev = "ffi_init", model = %model.name, version = model.version);
    }
    let mut slot = SCORER
        .write()
        .map_err(|_| SalesError::internal("scorer lock poisoned"))?;
    *slot = Some(scorer);
    Ok(())
}

/// Score a raw JSON request and return a JSON string (caller must free).
///
/// # Safety
/// `raw` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn booksales_run(raw: *const c_char) -> *const c_char {
    if raw.is_null() {
        return response_to_raw(&ScoreResponse::error(&SalesError::invalid("null request")));
    }
    let raw = CStr::from_ptr(raw).to_string_lossy();

    let body = match SCORER.read() {
        Ok(slot) => match slot.as_ref() {
            Some(scorer) => scorer.run_json(&raw),
            None => error_json(&SalesError::internal("booksales_init has not succeeded")),
        },
        Err(_) => error_json(&SalesError::internal("scorer lock poisoned")),
    };
    string_to_raw(body)
}

/// Free strings allocated by Rust.
///
/// # Safety
/// `ptr` must be null or a pointer returned by `booksales_run` that was not freed yet.
#[no_mangle]
pub unsafe extern "C" fn booksales_free_str(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    drop(CString::from_raw(ptr as *mut c_char));
}

fn error_json(err: &SalesError) -> String {
    serde_json::to_string(&ScoreResponse::error(err)).unwrap_or_else(|_| FALLBACK_JSON.to_string())
}

fn response_to_raw(resp: &ScoreResponse) -> *const c_char {
    string_to_raw(serde_json::to_string(resp).unwrap_or_else(|_| FALLBACK_JSON.to_string()))
}

fn string_to_raw(s: String) -> *const c_char {
    match CString::new(s) {
        Ok(cstring) => cstring.into_raw(),
        // serde_json escapes NUL, so this only guards hand-built strings
        Err(_) => CString::new(FALLBACK_JSON)
            .map(CString::into_raw)
            .unwrap_or(std::ptr::null_mut()),
    }
}
