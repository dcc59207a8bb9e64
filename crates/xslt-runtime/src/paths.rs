//! Breakpoint path normalization.
//!
//! Clients send paths in whatever shape their editor produced: URI-encoded,
//! `file://`-prefixed, backslashed, or differently cased. Breakpoint lookup
//! compares a normalized absolute form.

use percent_encoding::percent_decode_str;

/// Normalize a client-supplied path for case-insensitive comparison.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let stripped = match decoded.strip_prefix("file://") {
        Some(rest) => match rest.strip_prefix('/') {
            // `file:///c:/...` drops the slash before the drive letter,
            // `file:///home/...` keeps it.
            Some(after) if after.len() > 1 && after.as_bytes()[1] == b':' => after,
            _ => rest,
        },
        None => &decoded,
    };
    stripped.replace('\\', "/").to_lowercase()
}
