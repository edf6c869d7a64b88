// src/config/globs.rs

use std::fmt;

/// Names ignored unless `--no-default-ignore` is given.
pub const DEFAULT_IGNORE: &[&str] = &[
    // hidden and temporary files
    ".*", "~*", "*~",
    // object files
    "*.[ao]", "*.so", "*.obj",
    // log files
    "*.log",
    // test binaries and profiles
    "*.test", "*.prof",
    // windows binaries
    "*.exe", "*.dll",
];

/// A glob list made of built-in defaults plus user additions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobList {
    pub no_default: bool,
    pub default: Vec<String>,
    pub additional: Vec<String>,
}

impl GlobList {
    /// The ignore list, seeded with [`DEFAULT_IGNORE`].
    pub fn ignore() -> Self {
        Self {
            no_default: false,
            default: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            additional: Vec::new(),
        }
    }

    /// A list without defaults (used for `care`).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a raw flag value, splitting it on `;` and `:`.
    pub fn add(&mut self, value: &str) {
        self.additional.extend(split_patterns(value, &[';', ':']));
    }

    /// Effective list: defaults (unless disabled) followed by additions.
    pub fn all(&self) -> Vec<String> {
        if self.no_default {
            return self.additional.clone();
        }
        let mut out = self.default.clone();
        out.extend(self.additional.iter().cloned());
        out
    }
}

impl fmt::Display for GlobList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.all().join(";"))
    }
}

/// Split `value` on any of `separators`, dropping empty pieces.
pub fn split_patterns(value: &str, separators: &[char]) -> Vec<String> {
    value
        .split(|c| separators.contains(&c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
