// src/engine/mod.rs

//! Orchestration engine for watchrun.
//!
//! The [`Orchestrator`] consumes change batches from the watcher and keeps at
//! most one pipeline generation alive: every batch kills the previous
//! generation before the next one is launched. A shutdown signal stops the
//! watcher, and the last generation is killed once the change stream closes.

pub mod runtime;

pub use runtime::Orchestrator;
