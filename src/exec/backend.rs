// src/exec/backend.rs

//! Pluggable pipeline backend.
//!
//! The orchestrator talks to a `PipelineBackend` instead of constructing
//! [`Pipeline`]s itself. This makes it easy to swap in a fake in tests that
//! records launches and kills without spawning processes.

use std::sync::Arc;

use crate::exec::pipeline::{Pipeline, PipelineOptions};
use crate::exec::stage::Stage;

/// A launched pipeline generation, as seen by the orchestrator.
pub trait RunningPipeline: Send + Sync {
    fn generation(&self) -> u64;

    /// Terminate the generation. Must be idempotent and safe on a generation
    /// that already finished.
    fn kill(&self);
}

/// Starts pipeline generations.
pub trait PipelineBackend: Send {
    /// Start generation `generation` in the background and return a handle
    /// used only to kill it later.
    fn launch(&mut self, generation: u64) -> Box<dyn RunningPipeline>;
}

impl RunningPipeline for Pipeline {
    fn generation(&self) -> u64 {
        Pipeline::generation(self)
    }

    fn kill(&self) {
        Pipeline::kill(self)
    }
}

/// Real backend used in production: every launch runs the same stage list as
/// a fresh [`Pipeline`] on its own task.
#[derive(Debug, Clone)]
pub struct RealPipelineBackend {
    stages: Arc<[Stage]>,
    options: PipelineOptions,
}

impl RealPipelineBackend {
    pub fn new(stages: Vec<Stage>, options: PipelineOptions) -> Self {
        Self {
            stages: stages.into(),
            options,
        }
    }
}

impl PipelineBackend for RealPipelineBackend {
    fn launch(&mut self, generation: u64) -> Box<dyn RunningPipeline> {
        let pipeline = Pipeline::new(generation, Arc::clone(&self.stages), self.options.clone());
        // Detached; the pipeline is controlled through `kill` only.
        drop(pipeline.spawn());
        Box::new(pipeline)
    }
}
