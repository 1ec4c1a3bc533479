//! Text-to-slug transform used for every generated file name.

use crate::error::{Error, Result};

/// Maximum length of a sanitized record name or version.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of a sanitized namespace prefix.
pub const MAX_PREFIX_LEN: usize = 20;

/// Turn arbitrary text into a file-name-safe slug.
///
/// Trims the input, replaces each whitespace run with a single `_`, drops
/// every character outside `[A-Za-z0-9_-]`, collapses repeated underscores,
/// and truncates to `max_len` characters.
///
/// # Examples
///
/// ```
/// use auditstore_common::sanitize::sanitize;
///
/// assert_eq!(sanitize("  Traceability   Report ", 100), "Traceability_Report");
/// assert_eq!(sanitize("Rev. 2/B", 100), "Rev_2B");
/// assert_eq!(sanitize("abcdef", 3), "abc");
/// ```
pub fn sanitize(input: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_len));
    let mut in_whitespace = false;

    for c in input.trim().chars() {
        if c.is_whitespace() {
            in_whitespace = true;
            continue;
        }
        if in_whitespace {
            push_underscore(&mut out);
            in_whitespace = false;
        }
        if c == '_' {
            push_underscore(&mut out);
        } else if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
        }
    }

    // Output is pure ASCII, so byte truncation is char truncation.
    out.truncate(max_len);
    out
}

fn push_underscore(out: &mut String) {
    if !out.ends_with('_') {
        out.push('_');
    }
}

/// Sanitize a record name or version (bounded at [`MAX_NAME_LEN`]).
pub fn sanitize_name(input: &str) -> String {
    sanitize(input, MAX_NAME_LEN)
}

/// Sanitize a namespace prefix (bounded at [`MAX_PREFIX_LEN`]).
pub fn sanitize_prefix(input: &str) -> String {
    sanitize(input, MAX_PREFIX_LEN)
}

/// Sanitize a value that must not come out empty.
///
/// `what` names the field in the resulting validation message.
pub fn require_sanitized(input: &str, max_len: usize, what: &str) -> Result<String> {
    let slug = sanitize(input, max_len);
    if slug.is_empty() {
        return Err(Error::validation(format!(
            "{what} is required and must contain at least one letter, digit, '-' or '_'"
        )));
    }
    Ok(slug)
}
