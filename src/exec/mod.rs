// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`stage`] defines a single command and parses the CLI stage list.
//! - [`pipeline`] runs stages in order and supports a cooperative kill that
//!   takes down the whole process group of the active stage.
//! - [`pgroup`] hides the platform difference in process-group handling.
//! - [`log`] is the injected interface for the run/done/fail/kill lines.
//! - [`sink`] relays stage output into one stream per pipeline.
//! - [`backend`] is the seam the orchestrator launches pipelines through, so
//!   tests can swap in a fake.

pub mod backend;
pub mod log;
pub mod pgroup;
pub mod pipeline;
pub mod sink;
pub mod stage;

pub use backend::{PipelineBackend, RealPipelineBackend, RunningPipeline};
pub use log::{PipelineLog, StageEvent, TracingLog};
pub use pgroup::{platform_default, ProcessGroup};
pub use pipeline::{Pipeline, PipelineOptions, RunOutcome};
pub use sink::OutputTarget;
pub use stage::{parse_stages, Stage, STAGE_SEPARATORS};
