#![allow(dead_code)]

use std::time::Duration;

use watchrun::config::{WatchSettings, DEFAULT_IGNORE};
use watchrun::exec::Stage;

/// Builder for `WatchSettings` to simplify test setup.
///
/// Starts from the production defaults except for a short 20ms interval.
pub struct WatchSettingsBuilder {
    settings: WatchSettings,
}

impl WatchSettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: WatchSettings {
                monitor: Vec::new(),
                interval: Duration::from_millis(20),
                ..WatchSettings::default()
            },
        }
    }

    pub fn monitor(mut self, spec: &str) -> Self {
        self.settings.monitor.push(spec.to_string());
        self
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.settings.ignore.push(pattern.to_string());
        self
    }

    pub fn without_default_ignore(mut self) -> Self {
        self.settings
            .ignore
            .retain(|p| !DEFAULT_IGNORE.contains(&p.as_str()));
        self
    }

    pub fn care(mut self, pattern: &str) -> Self {
        self.settings.care.push(pattern.to_string());
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.settings.interval = interval;
        self
    }

    pub fn recurse(mut self, val: bool) -> Self {
        self.settings.recurse = val;
        self
    }

    pub fn build(mut self) -> WatchSettings {
        if self.settings.monitor.is_empty() {
            self.settings.monitor.push(".".to_string());
        }
        self.settings
    }
}

impl Default for WatchSettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A stage running `script` through `sh -c`.
pub fn sh(script: &str) -> Stage {
    Stage::new("sh", ["-c", script])
}
