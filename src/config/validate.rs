// src/config/validate.rs

use crate::config::model::{Config, PipelineSettings, WatchSettings};
use crate::errors::{Result, WatchrunError};
use crate::watch::patterns::{MonitorSpec, NameFilter};

/// Check a resolved config for problems that would otherwise only show up
/// once the watcher or pipeline is running.
pub fn validate(cfg: &Config) -> Result<()> {
    validate_watch(&cfg.watch)?;
    validate_pipeline(&cfg.pipeline)?;
    Ok(())
}

fn validate_watch(watch: &WatchSettings) -> Result<()> {
    if watch.interval.is_zero() {
        return Err(WatchrunError::ConfigError(
            "interval must be greater than zero".to_string(),
        ));
    }

    if watch.monitor.is_empty() {
        return Err(WatchrunError::ConfigError(
            "at least one path to monitor is required".to_string(),
        ));
    }

    // Compile everything once so bad globs are reported up front.
    NameFilter::new(&watch.ignore, &watch.care)?;
    for spec in &watch.monitor {
        MonitorSpec::parse(spec)?;
    }

    Ok(())
}

fn validate_pipeline(pipeline: &PipelineSettings) -> Result<()> {
    if pipeline.stages.is_empty() {
        return Err(WatchrunError::ConfigError(
            "no command to run; pass one after the options or set [pipeline].stages".to_string(),
        ));
    }

    if let Some(dir) = &pipeline.dir {
        if !dir.is_dir() {
            return Err(WatchrunError::ConfigError(format!(
                "working directory {:?} does not exist",
                dir
            )));
        }
    }

    Ok(())
}
