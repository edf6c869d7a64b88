// src/watch/mod.rs

//! Polling change detection.
//!
//! This module is responsible for:
//! - Compiling ignore / care globs and monitor specs ([`patterns`]).
//! - Building a [`Snapshot`] of `path -> modified time` for the monitored
//!   roots, fail-soft on unreadable entries ([`snapshot`]).
//! - Diffing consecutive snapshots into [`ChangeBatch`]es.
//! - Running the poll loop and delivering batches with backpressure
//!   ([`watcher`]).
//!
//! There is deliberately no OS event notification here; every tick rebuilds
//! the snapshot from scratch.

pub mod path_utils;
pub mod patterns;
pub mod snapshot;
pub mod watcher;

pub use patterns::{MonitorSpec, NameFilter};
pub use snapshot::{Change, ChangeBatch, Snapshot, SnapshotBuilder};
pub use watcher::{spawn_watcher, WatcherHandle, WatcherState};
