// src/exec/log.rs

use std::fmt;
use std::io;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::exec::stage::Stage;

/// Lifecycle events of a single stage.
#[derive(Debug)]
pub enum StageEvent<'a> {
    /// The stage is about to be spawned.
    Run { stage: &'a Stage },
    /// The stage exited successfully.
    Done { stage: &'a Stage, elapsed: Duration },
    /// The stage could not be started; the pipeline is halted.
    Fail { stage: &'a Stage, error: &'a io::Error },
    /// The stage exited unsuccessfully on its own; later stages are skipped.
    Exit { stage: &'a Stage, code: Option<i32> },
    /// The stage was killed because the pipeline was superseded.
    Kill { stage: &'a Stage },
}

/// Sink for the run/done/fail/kill lines that bracket stage output.
pub trait PipelineLog: Send + Sync + fmt::Debug {
    fn record(&self, generation: u64, event: StageEvent<'_>);
}

/// Default [`PipelineLog`] that writes through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl PipelineLog for TracingLog {
    fn record(&self, generation: u64, event: StageEvent<'_>) {
        match event {
            StageEvent::Run { stage } => info!(generation, "<<  run: {stage} >>"),
            StageEvent::Done { stage, elapsed } => {
                info!(generation, "<< done: {stage} {elapsed:.2?} >>")
            }
            StageEvent::Fail { stage, error } => {
                error!(generation, "<< fail: {stage}: {error} >>")
            }
            StageEvent::Exit { stage, code } => match code {
                Some(code) => warn!(generation, code, "<< exit: {stage} status {code} >>"),
                None => warn!(generation, "<< exit: {stage} terminated by signal >>"),
            },
            StageEvent::Kill { stage } => info!(generation, "<< kill: {stage} >>"),
        }
    }
}
