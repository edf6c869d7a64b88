// src/watch/path_utils.rs

//! Utility functions for path handling in the snapshot builder.

use std::path::{Component, Path, PathBuf};

/// Whether path comparisons should ignore case on this platform.
pub const CASE_INSENSITIVE: bool = cfg!(windows);

/// Clean a path into its snapshot key form.
///
/// - `.` components are dropped, so `./src/a.rs` and `src/a.rs` are the same
///   key (an all-`.` path becomes `.`).
/// - On case-insensitive platforms the result is lower-cased.
pub fn normalize(path: &Path) -> PathBuf {
    let cleaned: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let cleaned = if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    };

    if CASE_INSENSITIVE {
        PathBuf::from(fold_case(&cleaned.to_string_lossy()))
    } else {
        cleaned
    }
}

/// Lower-case `name` on case-insensitive platforms; identity elsewhere.
pub fn fold_case(name: &str) -> String {
    if CASE_INSENSITIVE {
        name.to_lowercase()
    } else {
        name.to_string()
    }
}

/// Render a path with forward slashes, for glob matching.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// True if `s` contains glob metacharacters.
pub fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

/// Base name of `path` as a string, if it has one.
pub fn base_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
