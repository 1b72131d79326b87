//! Helpers for sanitizing data before it reaches file names, logs or span
//! attributes.
//!
//! Provider error bodies can echo request data back, and artifact file
//! names come straight from user-supplied labels; both pass through here.

use std::path::Path;

/// Maximum length kept from a provider error body.
pub const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: shows the file name, never the directory.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// Makes a spec label safe to use as a file name stem.
///
/// ASCII letters and digits, `_`, `-` and Hangul syllables are kept; every
/// other character becomes `-`. An empty label becomes `image`.
pub fn sanitize_label(label: &str) -> String {
    let sanitized: String = label
        .chars()
        .map(|c| if is_label_char(c) { c } else { '-' })
        .collect();
    if sanitized.is_empty() {
        "image".to_string()
    } else {
        sanitized
    }
}

/// Truncates a provider error body to keep logs and result errors readable.
pub fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        Some((cut, _)) => format!("{}... (truncated)", &body[..cut]),
        None => body.to_string(),
    }
}
