// src/engine/runtime.rs

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::{PipelineBackend, RunningPipeline};
use crate::watch::{ChangeBatch, WatcherHandle};

/// Sequential consumer of change batches that restarts the pipeline.
pub struct Orchestrator<B: PipelineBackend> {
    backend: B,
    changes: mpsc::Receiver<ChangeBatch>,
    watcher: Option<WatcherHandle>,
    current: Option<Box<dyn RunningPipeline>>,
    generation: u64,
}

impl<B: PipelineBackend> fmt::Debug for Orchestrator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("watcher", &self.watcher)
            .field("generation", &self.generation)
            .field("active", &self.current.is_some())
            .finish_non_exhaustive()
    }
}

impl<B: PipelineBackend> Orchestrator<B> {
    pub fn new(backend: B, changes: mpsc::Receiver<ChangeBatch>) -> Self {
        Self {
            backend,
            changes,
            watcher: None,
            current: None,
            generation: 0,
        }
    }

    /// Attach the watcher that feeds `changes`, so shutdown can stop it.
    pub fn with_watcher(mut self, watcher: WatcherHandle) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Main loop.
    ///
    /// - Each non-empty batch kills the previous generation, then launches
    ///   a new one.
    /// - When `shutdown` resolves, the watcher is stopped and the active
    ///   generation killed; the loop keeps draining until the change channel
    ///   closes, launching nothing further. Without an attached watcher the
    ///   loop exits right away.
    /// - When the channel closes, the last generation is killed and the loop
    ///   returns.
    pub async fn run<S>(mut self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        info!("orchestrator started");
        tokio::pin!(shutdown);
        let mut shutting_down = false;

        loop {
            tokio::select! {
                batch = self.changes.recv() => match batch {
                    Some(_) if shutting_down => {
                        debug!("discarding change batch received during shutdown");
                    }
                    Some(batch) => self.on_batch(batch),
                    None => {
                        info!("change stream closed");
                        break;
                    }
                },
                () = &mut shutdown, if !shutting_down => {
                    info!("shutdown requested");
                    shutting_down = true;
                    self.kill_current();
                    match &self.watcher {
                        Some(watcher) => {
                            watcher.stop();
                        }
                        None => break,
                    }
                }
            }
        }

        self.kill_current();
        info!(generations = self.generation, "orchestrator exiting");
        Ok(())
    }

    fn on_batch(&mut self, batch: ChangeBatch) {
        if batch.is_empty() {
            debug!("empty change batch; nothing to restart");
            return;
        }

        for change in &batch {
            debug!(kind = %change.kind, path = ?change.path, "change");
        }

        self.kill_current();

        self.generation += 1;
        info!(
            generation = self.generation,
            changes = batch.len(),
            "changes detected; starting pipeline"
        );
        self.current = Some(self.backend.launch(self.generation));
    }

    fn kill_current(&mut self) {
        if let Some(pipeline) = self.current.take() {
            debug!(generation = pipeline.generation(), "killing pipeline generation");
            pipeline.kill();
        }
    }
}
