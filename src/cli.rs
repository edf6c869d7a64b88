// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::duration::parse_duration;

/// Command-line arguments for `watchrun`.
///
/// Everything after the options is the stage list, e.g.
///
/// ```text
/// watchrun --monitor src cargo build ;; ./target/debug/server
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchrun",
    version,
    about = "Poll files for changes and restart a chain of commands.",
    long_about = None
)]
pub struct CliArgs {
    /// Optional TOML config file. Command-line flags override its values.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Interval to wait between polls (also used as the settle delay).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Files, folders or globs to monitor. May be repeated; values are also
    /// split on `;`.
    #[arg(long, value_name = "SPEC")]
    pub monitor: Vec<String>,

    /// Ignore entries whose name matches these globs. May be repeated; values
    /// are split on `;` and `:`.
    #[arg(long, value_name = "GLOBS")]
    pub ignore: Vec<String>,

    /// Only report changes to files matching these globs.
    #[arg(long, value_name = "GLOBS")]
    pub care: Vec<String>,

    /// Do not apply the built-in ignore list.
    #[arg(long)]
    pub no_default_ignore: bool,

    /// Recurse into monitored folders. `--recurse` alone means true; use
    /// `--recurse=false` to disable.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub recurse: Option<bool>,

    /// Working directory for every stage.
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace, silent).
    ///
    /// If omitted, `WATCHRUN_LOG` or a default level will be used.
    #[arg(long = "log", value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Verbose output (same as `--log debug`).
    #[arg(long, short)]
    pub verbose: bool,

    /// Print the resolved options and stages, but don't watch or run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Stages to run, separated by `;;` or `==`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Silent,
}

impl CliArgs {
    /// Effective log level from the CLI alone; `--log` wins over `--verbose`.
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        match (self.log_level, self.verbose) {
            (Some(level), _) => Some(level),
            (None, true) => Some(LogLevel::Debug),
            (None, false) => None,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
