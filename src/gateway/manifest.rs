//! HLS manifest rewriting.
//!
//! A grant signs a directory prefix, not individual files, so every relative
//! segment or playlist reference inside a manifest is given the query string
//! that authorized the manifest itself. When the player follows those
//! references, each request presents the same grant and is verified again from
//! scratch. Nothing in the manifest is trusted.
//!
//! Tags such as `#EXT-X-MAP` and `#EXT-X-KEY` point at init segments and keys
//! through a quoted `URI` attribute; relative ones get the query as well.
//!
//! Rewriting only ever appends. Lines that do not look like media references
//! are passed through untouched, and a body that is not UTF-8 is returned as
//! is.

use bytes::Bytes;

/// Largest manifest body read into memory for rewriting.
pub const MAX_MANIFEST_BYTES: usize = 8 * 1024 * 1024;

/// Extensions of references that receive the query string.
const REFERENCE_EXTENSIONS: &[&str] = &[".ts", ".m4s", ".aac", ".m3u8"];

/// Rewrite a manifest body, appending `query` to every media reference line.
pub fn rewrite_manifest_bytes(body: &Bytes, query: &str) -> Bytes {
    match std::str::from_utf8(body) {
        Ok(text) => Bytes::from(rewrite_manifest(text, query)),
        Err(_) => body.clone(),
    }
}

/// Rewrite manifest text, appending `query` to every media reference line.
///
/// The query is joined with `?` when the reference has no query yet and with
/// `&` otherwise. Line endings, including a missing final newline, are
/// preserved.
pub fn rewrite_manifest(body: &str, query: &str) -> String {
    let query = query.trim_start_matches('?');
    if query.is_empty() {
        return body.to_string();
    }

    let mut out = String::with_capacity(body.len() + query.len() * 8);
    for line in body.split_inclusive('\n') {
        let (content, ending) = split_line_ending(line);
        let reference = content.trim_end();

        if is_media_reference(reference) {
            out.push_str(reference);
            out.push_str(query_separator(reference));
            out.push_str(query);
            out.push_str(&content[reference.len()..]);
        } else if content.trim_start().starts_with('#') {
            rewrite_uri_attributes(content, query, &mut out);
        } else {
            out.push_str(content);
        }
        out.push_str(ending);
    }
    out
}

/// Copy a tag line to `out`, appending `query` inside every relative
/// `URI="..."` attribute value.
fn rewrite_uri_attributes(tag: &str, query: &str, out: &mut String) {
    const ATTRIBUTE: &str = "URI=\"";

    let mut rest = tag;
    while let Some(found) = rest.find(ATTRIBUTE) {
        let value_start = found + ATTRIBUTE.len();
        // Must be a whole attribute name, not the tail of e.g. `KEYURI=`.
        let whole_name = rest[..found]
            .chars()
            .next_back()
            .map_or(true, |c| c == ':' || c == ',');
        let Some(value_len) = rest[value_start..].find('"') else {
            break;
        };
        let value = &rest[value_start..value_start + value_len];

        out.push_str(&rest[..value_start]);
        out.push_str(value);
        if whole_name && is_relative_uri(value) {
            out.push_str(query_separator(value));
            out.push_str(query);
        }
        rest = &rest[value_start + value_len..];
    }
    out.push_str(rest);
}

/// Whether an attribute URI is relative to the manifest.
///
/// Anything carrying a scheme (`https:`, `data:`, `skd:`) or a host is left
/// alone.
fn is_relative_uri(uri: &str) -> bool {
    if uri.is_empty() || uri.starts_with("//") {
        return false;
    }
    let scheme_end = uri.find(|c| matches!(c, ':' | '/' | '?' | '#'));
    !matches!(scheme_end, Some(i) if i > 0 && uri[i..].starts_with(':'))
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

fn query_separator(reference: &str) -> &'static str {
    if !reference.contains('?') {
        "?"
    } else if reference.ends_with('?') || reference.ends_with('&') {
        ""
    } else {
        "&"
    }
}

/// Whether a manifest line is a relative reference to a segment or playlist.
fn is_media_reference(line: &str) -> bool {
    let line = line.trim_start();
    if line.is_empty() || line.starts_with('#') {
        return false;
    }
    // Absolute and scheme-relative URLs point at other hosts.
    if line.contains("://") || line.starts_with("//") {
        return false;
    }
    let path = line.split('?').next().unwrap_or(line).to_ascii_lowercase();
    REFERENCE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
