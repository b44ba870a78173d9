//! Filename sanitizing and rename helpers.

use hoard_core::constants::{FALLBACK_FILENAME, MAX_FILENAME_LENGTH};
use std::path::Path;

/// Make a filename safe to use as a storage-key component.
///
/// Drops any directory part, replaces everything except ASCII letters,
/// digits, `.`, `-` and `_` with `_`, collapses runs of dots and strips
/// leading dots. Sanitizing an already-sanitized name returns it unchanged.
pub fn sanitize(filename: &str) -> String {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    let mut sanitized = String::with_capacity(basename.len());
    for c in basename.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if c == '.' && sanitized.ends_with('.') {
            continue;
        }
        sanitized.push(c);
    }

    let sanitized: String = sanitized
        .trim_start_matches('.')
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .collect();

    if sanitized.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// Extension of `filename`, without the dot.
pub fn extension(filename: &str) -> Option<&str> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
}

/// Re-append the original extension when `new_name` has none.
///
/// A trailing dot counts as no extension and is dropped.
pub fn preserve_extension(original: &str, new_name: &str) -> String {
    match (extension(new_name), extension(original)) {
        (None, Some(ext)) => format!("{}.{}", new_name.trim_end_matches('.'), ext),
        _ => new_name.to_string(),
    }
}

/// Display name for a rename: sanitized, keeping the stored extension.
pub fn renamed(original: &str, requested: &str) -> String {
    preserve_extension(original, &sanitize(requested))
}
