//! FFI interface for C/C++ hosts
//!
//! The host passes the raw document bytes it fetched and gets back the
//! response envelope as JSON.

use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::sync::OnceLock;

use crate::config::PipelineConfig;
use crate::document::{RawDocument, ShapeHint};
use crate::error::ExtractResult;
use crate::pipeline::{Pipeline, RecordKind};

/// Result struct returned to the host
/// Both pointers are owned by Rust and must be freed via free_extraction_result
#[repr(C)]
pub struct ExtractionResultFFI {
    /// JSON-serialized envelope (null-terminated)
    pub json_ptr: *mut c_char,
    /// Error message if the call itself was malformed (null-terminated), or null
    pub error_ptr: *mut c_char,
}

fn default_pipeline() -> ExtractResult<&'static Pipeline> {
    static PIPELINE: OnceLock<Pipeline> = OnceLock::new();
    if let Some(pipeline) = PIPELINE.get() {
        return Ok(pipeline);
    }
    let pipeline = Pipeline::new(&PipelineConfig::default())?;
    Ok(PIPELINE.get_or_init(|| pipeline))
}

/// Extract records from a fetched document.
///
/// # Arguments
/// * `bytes_ptr` - Pointer to the document bytes (UTF-8, not necessarily null-terminated)
/// * `bytes_len` - Length of the document in bytes
/// * `shape` - Shape hint, e.g. `markup-tree` or `embedded-structured-value` (null-terminated)
/// * `kind` - Record kind: `title-list`, `venue-listing` or `item-detail` (null-terminated)
///
/// # Returns
/// ExtractionResultFFI with json_ptr set to the envelope, or error_ptr set
/// when the arguments themselves are invalid
///
/// # Safety
/// - `bytes_ptr` must point to valid memory of at least `bytes_len` bytes
/// - `shape` and `kind` must be valid null-terminated C strings
/// - Caller must free the result via `free_extraction_result`
#[no_mangle]
pub unsafe extern "C" fn extract_document(
    bytes_ptr: *const c_char,
    bytes_len: usize,
    shape: *const c_char,
    kind: *const c_char,
) -> ExtractionResultFFI {
    let bytes = if bytes_ptr.is_null() || bytes_len == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(bytes_ptr as *const u8, bytes_len).to_vec()
    };

    let shape = match read_arg(shape, "shape").and_then(|s| s.parse::<ShapeHint>().map_err(|e| e.to_string())) {
        Ok(s) => s,
        Err(msg) => return make_error_result(&msg),
    };
    let kind = match read_arg(kind, "kind").and_then(|s| s.parse::<RecordKind>().map_err(|e| e.to_string())) {
        Ok(k) => k,
        Err(msg) => return make_error_result(&msg),
    };

    let pipeline = match default_pipeline() {
        Ok(p) => p,
        Err(e) => return make_error_result(&format!("Failed to build pipeline: {}", e)),
    };

    let envelope = pipeline.respond(Ok(RawDocument::new(bytes, shape)), kind);

    match serde_json::to_string(&envelope) {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => ExtractionResultFFI {
                json_ptr: cstr.into_raw(),
                error_ptr: ptr::null_mut(),
            },
            Err(_) => make_error_result("Result JSON contains null bytes"),
        },
        Err(e) => make_error_result(&format!("Failed to serialize result: {}", e)),
    }
}

/// Free an ExtractionResultFFI returned by extract_document
///
/// # Safety
/// - `result` must have been returned by `extract_document`
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn free_extraction_result(result: ExtractionResultFFI) {
    if !result.json_ptr.is_null() {
        drop(CString::from_raw(result.json_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

unsafe fn read_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("{} is null", name));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| format!("Invalid UTF-8 in {}", name))
}

fn make_error_result(msg: &str) -> ExtractionResultFFI {
    let error = CString::new(msg).unwrap_or_else(|_| CString::from(c"error message contained a null byte"));
    ExtractionResultFFI {
        json_ptr: ptr::null_mut(),
        error_ptr: error.into_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take(result: ExtractionResultFFI) -> (Option<String>, Option<String>) {
        let json = (!result.json_ptr.is_null())
            .then(|| CStr::from_ptr(result.json_ptr).to_string_lossy().into_owned());
        let error = (!result.error_ptr.is_null())
            .then(|| CStr::from_ptr(result.error_ptr).to_string_lossy().into_owned());
        free_extraction_result(result);
        (json, error)
    }

    #[test]
    fn test_extract_document_returns_envelope() {
        let html = r#"<div class="lister-list"><div class="lister-item"><h3 class="lister-item-header"><a>Heat</a><span class="lister-item-year">(1995)</span></h3></div></div>"#;
        let shape = CString::new("markup-tree").unwrap();
        let kind = CString::new("title-list").unwrap();

        let (json, error) = unsafe {
            take(extract_document(
                html.as_ptr() as *const c_char,
                html.len(),
                shape.as_ptr(),
                kind.as_ptr(),
            ))
        };
        assert!(error.is_none());
        let value: serde_json::Value = serde_json::from_str(&json.unwrap()).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["items"][0]["title"], "Heat");
        assert_eq!(value["items"][0]["year"], 1995);
    }

    #[test]
    fn test_structure_failure_is_an_envelope_not_an_error() {
        let html = "<p>maintenance</p>";
        let shape = CString::new("markup").unwrap();
        let kind = CString::new("item-detail").unwrap();

        let (json, error) = unsafe {
            take(extract_document(
                html.as_ptr() as *const c_char,
                html.len(),
                shape.as_ptr(),
                kind.as_ptr(),
            ))
        };
        assert!(error.is_none());
        assert_eq!(json.unwrap(), r#"{"error":"Unexpected document structure"}"#);
    }

    #[test]
    fn test_bad_arguments() {
        let kind = CString::new("title-list").unwrap();
        let shape = CString::new("pdf").unwrap();

        let (json, error) = unsafe { take(extract_document(ptr::null(), 0, ptr::null(), kind.as_ptr())) };
        assert!(json.is_none());
        assert_eq!(error.unwrap(), "shape is null");

        let (json, error) = unsafe { take(extract_document(ptr::null(), 0, shape.as_ptr(), kind.as_ptr())) };
        assert!(json.is_none());
        assert!(error.unwrap().contains("unknown shape hint"));
    }
}
