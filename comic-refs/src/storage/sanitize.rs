//! Filesystem-safe names.

use crate::model::RESERVED_NAME_CHARS;

/// Name used when sanitizing leaves nothing behind.
pub const UNNAMED: &str = "unnamed";

/// Make `name` safe to use as a file or directory name.
///
/// Reserved characters become `_`, leading and trailing dots and spaces are
/// trimmed, and an empty result falls back to [`UNNAMED`]. The function is
/// deterministic and idempotent.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED_NAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');

    if trimmed.is_empty() {
        UNNAMED.to_string()
    } else {
        trimmed.to_string()
    }
}
