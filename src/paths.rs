//! Path equivalence for sandboxed filesystems.
//!
//! Sandboxed hosts alias the data container under two spellings: the kernel
//! reports paths under `/private/var/...` while most APIs hand out
//! `/var/...`. Comparing working directories or looking up access grants has
//! to treat the two as the same location. No other normalization (symlinks,
//! case folding, trailing slashes) happens here.

use std::path::Path;

const PRIVATE_PREFIX: &str = "/private";

/// Whether `a` and `b` denote the same filesystem entry.
///
/// Identical strings are equal; `/private/var/...` equals the same suffix
/// spelled `/var/...` and vice versa. Total: any input that matches neither
/// rule is simply "not equal".
pub fn same_location(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    if a.starts_with("/private/") && b.starts_with("/var/") {
        return &a[PRIVATE_PREFIX.len()..] == b;
    }
    if a.starts_with("/var/") && b.starts_with("/private/") {
        return a == &b[PRIVATE_PREFIX.len()..];
    }
    false
}

/// Rewrite a path to its other storage spelling: strip a leading `/private`,
/// or prepend it to a `/var` path. Returns `None` when neither prefix
/// applies, so callers can skip the second grant lookup entirely.
pub fn toggle_private_prefix(path: &str) -> Option<String> {
    if let Some(rest) = path.strip_prefix(PRIVATE_PREFIX) {
        Some(rest.to_string())
    } else if path.starts_with("/var") {
        Some(format!("{PRIVATE_PREFIX}{path}"))
    } else {
        None
    }
}

/// Last path component, used for default bookmark names. Falls back to the
/// input itself for paths without one (e.g. `/`).
pub fn last_component(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

/// Number of path components, counting the root. `/var/mobile` has three.
pub fn component_count(path: &Path) -> usize {
    path.components().count()
}
