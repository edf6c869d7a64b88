// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::cli::CliArgs;
use crate::config::duration::parse_duration;
use crate::config::globs::{split_patterns, GlobList};
use crate::config::model::{
    Config, ConfigFile, PipelineSettings, WatchSettings, DEFAULT_INTERVAL,
};
use crate::config::validate::validate;
use crate::errors::{Result, WatchrunError};
use crate::exec::stage::{parse_stages, Stage};

/// Load a configuration file from a given path.
///
/// This only performs TOML deserialization; use [`resolve`] to merge the file
/// with command-line flags and validate the result.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: ConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Build the effective [`Config`] from the CLI and the optional config file.
///
/// Precedence: CLI flags > config file > built-in defaults. The result is
/// validated, so stage list and glob errors surface here, before any watcher
/// or pipeline exists.
pub fn resolve(args: &CliArgs) -> Result<Config> {
    let file = match &args.config {
        Some(path) => load_from_path(path)?,
        None => ConfigFile::default(),
    };

    let config = merge(args, file)?;
    validate(&config)?;
    Ok(config)
}

fn merge(args: &CliArgs, file: ConfigFile) -> Result<Config> {
    let mut ignore = GlobList::ignore();
    ignore.no_default = args.no_default_ignore || file.watch.no_default_ignore.unwrap_or(false);
    for value in file.watch.ignore.iter().chain(args.ignore.iter()) {
        ignore.add(value);
    }

    let mut care = GlobList::empty();
    for value in file.watch.care.iter().chain(args.care.iter()) {
        care.add(value);
    }

    let mut monitor: Vec<String> = if args.monitor.is_empty() {
        file.watch.monitor.unwrap_or_default()
    } else {
        args.monitor
            .iter()
            .flat_map(|m| split_patterns(m, &[';']))
            .collect()
    };
    if monitor.is_empty() {
        monitor.push(".".to_string());
    }

    let interval = match (args.interval, file.watch.interval.as_deref()) {
        (Some(d), _) => d,
        (None, Some(s)) => parse_duration(s).map_err(|e| {
            WatchrunError::ConfigError(format!("[watch].interval: {e}"))
        })?,
        (None, None) => DEFAULT_INTERVAL,
    };

    let recurse = args.recurse.or(file.watch.recurse).unwrap_or(true);

    let stages = if args.command.is_empty() {
        file.pipeline
            .stages
            .into_iter()
            .enumerate()
            .map(|(idx, argv)| {
                Stage::from_argv(argv).ok_or_else(|| {
                    WatchrunError::ConfigError(format!(
                        "[pipeline].stages[{idx}] must name a command"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        parse_stages(&args.command)?
    };

    Ok(Config {
        watch: WatchSettings {
            monitor,
            ignore: ignore.all(),
            care: care.all(),
            interval,
            recurse,
        },
        pipeline: PipelineSettings {
            stages,
            dir: args.dir.clone().or(file.pipeline.dir),
        },
    })
}
