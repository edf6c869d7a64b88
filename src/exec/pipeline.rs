// src/exec/pipeline.rs

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::process::Child;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::exec::log::{PipelineLog, StageEvent, TracingLog};
use crate::exec::pgroup::{platform_default, ProcessGroup};
use crate::exec::sink::{OutputSink, OutputTarget};
use crate::exec::stage::Stage;

/// Settings shared by every pipeline generation.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Working directory for every stage; inherited when `None`.
    pub dir: Option<PathBuf>,
    pub output: OutputTarget,
    pub log: Arc<dyn PipelineLog>,
    pub group: Arc<dyn ProcessGroup>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dir: None,
            output: OutputTarget::Stdout,
            log: Arc::new(TracingLog),
            group: platform_default(),
        }
    }
}

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every stage exited successfully.
    Completed,
    /// Stage `stage` exited unsuccessfully on its own.
    Failed { stage: usize, code: Option<i32> },
    /// Stage `stage` could not be spawned.
    StartFailed { stage: usize },
    /// The pipeline was killed before or during a stage.
    Killed,
}

enum StageOutcome {
    Succeeded,
    Failed(Option<i32>),
    StartFailed,
    Killed,
}

/// A sequence of stages run one after another, with a cooperative kill.
///
/// Cloning gives another handle to the same pipeline. The active process and
/// the `killed` flag are only touched while holding the internal mutex, and
/// the mutex is never held across an `.await`.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

struct Inner {
    generation: u64,
    stages: Arc<[Stage]>,
    options: PipelineOptions,
    state: Mutex<RunState>,
    output_closed: CancellationToken,
}

#[derive(Default)]
struct RunState {
    active: Option<ActiveStage>,
    killed: bool,
}

struct ActiveStage {
    stage: Stage,
    pid: Option<u32>,
    /// Fires the hard kill in the task waiting on the child.
    cancel: Option<oneshot::Sender<()>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("generation", &self.inner.generation)
            .field("stages", &self.inner.stages.len())
            .field("killed", &self.is_killed())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(generation: u64, stages: impl Into<Arc<[Stage]>>, options: PipelineOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                generation,
                stages: stages.into(),
                options,
                state: Mutex::new(RunState::default()),
                output_closed: CancellationToken::new(),
            }),
        }
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn stages(&self) -> &[Stage] {
        &self.inner.stages
    }

    pub fn is_killed(&self) -> bool {
        self.inner.lock_state().killed
    }

    /// Run the pipeline on a detached task.
    pub fn spawn(&self) -> JoinHandle<RunOutcome> {
        let this = self.clone();
        tokio::spawn(async move { this.run().await })
    }

    /// Run every stage in order, stopping at the first one that does not
    /// exit successfully or when the pipeline is killed.
    pub async fn run(&self) -> RunOutcome {
        let inner = &self.inner;
        let sink = OutputSink::spawn(inner.options.output.clone(), inner.output_closed.clone());

        let mut outcome = RunOutcome::Completed;
        for (index, stage) in inner.stages.iter().enumerate() {
            match self.run_stage(stage, &sink).await {
                StageOutcome::Succeeded => {}
                StageOutcome::Failed(code) => {
                    outcome = RunOutcome::Failed { stage: index, code };
                    break;
                }
                StageOutcome::StartFailed => {
                    outcome = RunOutcome::StartFailed { stage: index };
                    break;
                }
                StageOutcome::Killed => {
                    outcome = RunOutcome::Killed;
                    break;
                }
            }
        }

        sink.finish().await;
        debug!(generation = inner.generation, ?outcome, "pipeline finished");
        outcome
    }

    async fn run_stage(&self, stage: &Stage, sink: &OutputSink) -> StageOutcome {
        let inner = &self.inner;

        let spawned = {
            let mut state = inner.lock_state();
            if state.killed {
                return StageOutcome::Killed;
            }

            let mut cmd = stage.to_command(inner.options.dir.as_deref());
            inner.options.group.setup(&mut cmd);
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            inner.log(StageEvent::Run { stage });

            match cmd.spawn() {
                Ok(child) => {
                    let (cancel_tx, cancel_rx) = oneshot::channel();
                    state.active = Some(ActiveStage {
                        stage: stage.clone(),
                        pid: child.id(),
                        cancel: Some(cancel_tx),
                    });
                    Ok((child, cancel_rx))
                }
                Err(err) => {
                    state.killed = true;
                    Err(err)
                }
            }
        };

        let (mut child, cancel_rx) = match spawned {
            Ok(started) => started,
            Err(err) => {
                inner.output_closed.cancel();
                inner.log(StageEvent::Fail { stage, error: &err });
                return StageOutcome::StartFailed;
            }
        };

        let started = Instant::now();
        let writer = sink.writer();
        let mut pumps = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            pumps.push(writer.clone().pump(out));
        }
        if let Some(err) = child.stderr.take() {
            pumps.push(writer.pump(err));
        }

        let status = wait_or_kill(&mut child, cancel_rx, inner.generation).await;

        for pump in pumps {
            let _ = pump.await;
        }

        let killed = {
            let mut state = inner.lock_state();
            state.active = None;
            state.killed
        };

        match status {
            Ok(status) if status.success() => {
                inner.log(StageEvent::Done {
                    stage,
                    elapsed: started.elapsed(),
                });
                StageOutcome::Succeeded
            }
            Ok(status) if killed => {
                debug!(generation = inner.generation, %status, "stage ended by kill");
                StageOutcome::Killed
            }
            Ok(status) => {
                inner.log(StageEvent::Exit {
                    stage,
                    code: status.code(),
                });
                StageOutcome::Failed(status.code())
            }
            Err(_) if killed => StageOutcome::Killed,
            Err(err) => {
                error!(generation = inner.generation, stage = %stage, error = %err, "waiting for stage failed");
                StageOutcome::Failed(None)
            }
        }
    }

    /// Terminate the active stage (if any) and refuse to start further ones.
    ///
    /// Safe to call repeatedly, and before the pipeline ever started a stage.
    /// Returns once the termination signal has been issued; the process may
    /// still be exiting.
    pub fn kill(&self) {
        let inner = &self.inner;
        let mut state = inner.lock_state();

        if let Some(mut active) = state.active.take() {
            inner.log(StageEvent::Kill {
                stage: &active.stage,
            });
            inner.output_closed.cancel();

            if let Some(pid) = active.pid {
                if let Err(err) = inner.options.group.terminate(pid) {
                    warn!(generation = inner.generation, pid, error = %err, "failed to signal process group");
                }
            }
            if let Some(cancel) = active.cancel.take() {
                let _ = cancel.send(());
            }
        }

        state.killed = true;
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self, event: StageEvent<'_>) {
        self.options.log.record(self.generation, event);
    }
}

/// Wait for `child`; on a kill request, hard-kill it and reap it.
async fn wait_or_kill(
    child: &mut Child,
    mut cancel_rx: oneshot::Receiver<()>,
    generation: u64,
) -> std::io::Result<std::process::ExitStatus> {
    tokio::select! {
        status = child.wait() => status,
        cancel = &mut cancel_rx => {
            if cancel.is_ok() {
                if let Err(err) = child.start_kill() {
                    debug!(generation, error = %err, "hard kill failed; process already gone");
                }
            }
            child.wait().await
        }
    }
}
