// src/watch/patterns.rs

use std::fmt;
use std::path::PathBuf;

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::errors::{Result, WatchrunError};
use crate::watch::path_utils::{fold_case, has_glob_meta, CASE_INSENSITIVE};

/// Compiled ignore and care globs.
///
/// - `ignore` is matched against entry base names during traversal. A match
///   prunes the entry, and for a directory its whole subtree.
/// - `care` is matched against a file's base name and its normalized path;
///   an empty care list accepts every file.
#[derive(Clone, Default)]
pub struct NameFilter {
    ignore: Option<GlobSet>,
    care: Option<GlobSet>,
}

impl fmt::Debug for NameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameFilter")
            .field("ignore", &self.ignore.as_ref().map(GlobSet::len))
            .field("care", &self.care.as_ref().map(GlobSet::len))
            .finish()
    }
}

impl NameFilter {
    pub fn new(ignore: &[String], care: &[String]) -> Result<Self> {
        Ok(Self {
            ignore: build_globset(ignore)?,
            care: build_globset(care)?,
        })
    }

    /// Returns true if an entry with this base name must be skipped.
    pub fn is_ignored(&self, name: &str) -> bool {
        match &self.ignore {
            Some(set) => set.is_match(fold_case(name)),
            None => false,
        }
    }

    /// Returns true if a file should be recorded in the snapshot.
    pub fn cares(&self, name: &str, path: &str) -> bool {
        match &self.care {
            Some(set) => set.is_match(fold_case(name)) || set.is_match(fold_case(path)),
            None => true,
        }
    }
}

/// One resolved entry of the `monitor` list.
#[derive(Debug, Clone)]
pub enum MonitorSpec {
    /// A literal file or directory.
    Path(PathBuf),
    /// A glob, resolved by walking `base` and matching normalized paths.
    Glob {
        pattern: String,
        base: PathBuf,
        matcher: GlobMatcher,
        /// Maximum walk depth below `base`; `None` when the pattern has `**`.
        max_depth: Option<usize>,
    },
}

impl MonitorSpec {
    /// Parse a monitor spec. An empty spec means the current directory.
    pub fn parse(spec: &str) -> Result<Self> {
        let cleaned = clean_spec(spec);
        if !has_glob_meta(&cleaned) {
            return Ok(MonitorSpec::Path(PathBuf::from(cleaned)));
        }

        let parts: Vec<&str> = cleaned.split('/').collect();
        let first_glob = parts
            .iter()
            .position(|p| has_glob_meta(p))
            .unwrap_or(0);

        let base_str = parts[..first_glob].join("/");
        let base = if !base_str.is_empty() {
            PathBuf::from(base_str)
        } else if cleaned.starts_with('/') {
            PathBuf::from("/")
        } else {
            PathBuf::from(".")
        };

        let max_depth = if parts[first_glob..].iter().any(|p| p.contains("**")) {
            None
        } else {
            Some(parts.len() - first_glob)
        };

        let matcher = compile_glob(&cleaned)?.compile_matcher();

        Ok(MonitorSpec::Glob {
            pattern: cleaned,
            base,
            matcher,
            max_depth,
        })
    }
}

/// Forward slashes, no leading `./`, empty becomes `.`.
fn clean_spec(spec: &str) -> String {
    let mut s = spec.trim().replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    if s.is_empty() {
        s.push('.');
    }
    s
}

fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .case_insensitive(CASE_INSENSITIVE)
        .build()
        .map_err(|source| WatchrunError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })
}

/// Build a GlobSet from simple string patterns; `None` for an empty list.
fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    let set = builder.build().map_err(|source| WatchrunError::InvalidGlob {
        pattern: patterns.join(";"),
        source,
    })?;
    Ok(Some(set))
}
