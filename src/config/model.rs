// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::config::globs::DEFAULT_IGNORE;
use crate::exec::Stage;

/// Poll interval used when neither the config file nor the CLI set one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(300);

/// Optional TOML configuration file.
///
/// ```toml
/// [watch]
/// monitor = ["src", "*.toml"]
/// ignore = ["target"]
/// care = ["*.rs"]
/// interval = "300ms"
/// recurse = true
///
/// [pipeline]
/// dir = "."
/// stages = [["cargo", "build"], ["./target/debug/server"]]
/// ```
///
/// All sections are optional; command-line flags override every value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub pipeline: PipelineSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    pub monitor: Option<Vec<String>>,

    #[serde(default)]
    pub ignore: Vec<String>,

    #[serde(default)]
    pub care: Vec<String>,

    pub no_default_ignore: Option<bool>,

    /// Duration string, e.g. `"300ms"`.
    pub interval: Option<String>,

    pub recurse: Option<bool>,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    pub dir: Option<PathBuf>,

    /// Each inner list is `[command, args...]`.
    #[serde(default)]
    pub stages: Vec<Vec<String>>,
}

/// Resolved watcher settings, passed to the snapshot builder and watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    pub monitor: Vec<String>,
    /// Effective ignore list (defaults already merged in).
    pub ignore: Vec<String>,
    pub care: Vec<String>,
    pub interval: Duration,
    pub recurse: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            monitor: vec![".".to_string()],
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            care: Vec::new(),
            interval: DEFAULT_INTERVAL,
            recurse: true,
        }
    }
}

/// Resolved pipeline settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSettings {
    pub stages: Vec<Stage>,
    pub dir: Option<PathBuf>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub watch: WatchSettings,
    pub pipeline: PipelineSettings,
}
