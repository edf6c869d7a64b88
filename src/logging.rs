// src/logging.rs

//! Logging setup for `watchrun` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log` / `--verbose` CLI flags (if provided)
//! 2. `WATCHRUN_LOG` environment variable (e.g. "info", "debug", "silent")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that stage output on STDOUT stays untouched.

use anyhow::Result;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_filter(lvl),
        None => std::env::var("WATCHRUN_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .map(level_filter)
            .unwrap_or(LevelFilter::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

pub fn level_filter(lvl: LogLevel) -> LevelFilter {
    match lvl {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Silent => LevelFilter::OFF,
    }
}

pub fn parse_level_str(s: &str) -> Option<LogLevel> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(LogLevel::Error),
        "warn" | "warning" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" => Some(LogLevel::Trace),
        "silent" | "off" => Some(LogLevel::Silent),
        _ => None,
    }
}
