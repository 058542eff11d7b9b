//! Object path normalization and prefix containment.
//!
//! The signer signs the normalized path's directory and the gateway re-derives
//! the object path from the request URI with the same functions. Any drift
//! between the two sides makes every signature fail closed.

use crate::error::PathError;

/// Normalize an object path.
///
/// - Leading and repeated slashes are removed
/// - `.` and `..` segments are dropped (never resolved against a parent)
/// - ASCII control characters are rejected
///
/// A trailing slash is not preserved. The function is idempotent.
pub fn normalize_object_path(path: &str) -> Result<String, PathError> {
    if let Some(pos) = path.bytes().position(|b| b.is_ascii_control()) {
        return Err(PathError::ControlCharacter(pos));
    }

    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect();

    Ok(segments.join("/"))
}

/// Percent-decode a raw request path and normalize it.
pub fn decode_request_path(raw: &str) -> Result<String, PathError> {
    let decoded = urlencoding::decode(raw).map_err(|_| PathError::InvalidEncoding)?;
    normalize_object_path(&decoded)
}

/// Normalize a directory prefix, guaranteeing a trailing `/`.
///
/// Returns an empty string when nothing is left after normalization.
pub fn normalize_prefix(prefix: &str) -> Result<String, PathError> {
    let mut normalized = normalize_object_path(prefix)?;
    if !normalized.is_empty() {
        normalized.push('/');
    }
    Ok(normalized)
}

/// Derive the directory prefix a single-object grant covers.
///
/// This is everything up to and including the last `/`. A path without any
/// slash is treated as a directory name and gets a `/` appended.
pub fn signed_prefix_for(normalized_path: &str) -> String {
    match normalized_path.rfind('/') {
        Some(idx) => normalized_path[..=idx].to_string(),
        None => format!("{}/", normalized_path),
    }
}

/// Check that `object_path` lies inside the directory `prefix`.
///
/// Prefixes that do not end in `/` never contain anything, so `a/b` cannot be
/// used to reach `a/bx/...`.
pub fn is_within_prefix(object_path: &str, prefix: &str) -> bool {
    prefix.ends_with('/') && object_path.starts_with(prefix)
}
