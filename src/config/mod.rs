// src/config/mod.rs

//! Configuration: optional TOML file, CLI overrides, and validation.
//!
//! - [`model`] holds the raw TOML structs and the resolved settings types.
//! - [`loader`] reads the TOML file and merges it with [`crate::cli::CliArgs`].
//! - [`validate`] checks the resolved settings before anything is started.
//! - [`globs`] manages the ignore/care glob lists and their defaults.
//! - [`duration`] parses human durations such as `300ms`.

pub mod duration;
pub mod globs;
pub mod loader;
pub mod model;
pub mod validate;

pub use globs::{split_patterns, GlobList, DEFAULT_IGNORE};
pub use loader::{load_from_path, resolve};
pub use model::{
    Config, ConfigFile, PipelineSection, PipelineSettings, WatchSection, WatchSettings,
    DEFAULT_INTERVAL,
};
