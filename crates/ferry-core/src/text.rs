//! Text normalization and cache fingerprints.
//!
//! A fingerprint is a deterministic, thread-independent key derived from
//! query text (plus attachment MIME type). Two queries that differ only in
//! casing, punctuation, or whitespace produce the same fingerprint.

use sha2::{Digest, Sha256};

use crate::query::Query;

/// Normalize text for fingerprinting: lowercase, strip punctuation,
/// collapse runs of whitespace to single spaces.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            // Lowercasing can expand to combining marks; keep only the
            // alphanumeric parts so normalization stays idempotent.
            for lower in ch.to_lowercase() {
                if lower.is_alphanumeric() {
                    out.push(lower);
                }
            }
        } else {
            // Whitespace and punctuation both act as separators.
            pending_space = true;
        }
    }
    out
}

/// Exact-match cache key for a query.
///
/// Covers normalized text and attachment MIME type; never the thread ID,
/// so identical questions across conversations share cache entries.
#[must_use]
pub fn fingerprint(query: &Query) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(&query.text).as_bytes());
    hasher.update(b"\n");
    if let Some(attachment) = &query.attachment {
        hasher.update(attachment.mime_type.to_ascii_lowercase().as_bytes());
    }
    hex_encode(&hasher.finalize())
}

/// Truncate a string to at most `max_bytes` bytes at a char boundary.
#[inline]
#[must_use]
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    // Walk backward to find a char boundary.
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Truncate `s` and append `suffix` if the original exceeds `max_bytes`.
///
/// The returned string is at most `max_bytes` bytes long including the
/// suffix.
#[must_use]
pub fn truncate_with_suffix(s: &str, max_bytes: usize, suffix: &str) -> String {
    if s.len() <= max_bytes {
        return s.to_owned();
    }
    let body_budget = max_bytes.saturating_sub(suffix.len());
    format!("{}{suffix}", truncate_str(s, body_budget))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
