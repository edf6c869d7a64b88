use std::sync::{Arc, Mutex};

use watchrun::exec::{PipelineLog, StageEvent};

/// Flattened copy of a `StageEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Run(String),
    Done(String),
    Fail(String),
    Exit(String, Option<i32>),
    Kill(String),
}

/// A `PipelineLog` that keeps every event for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingLog {
    events: Arc<Mutex<Vec<(u64, Recorded)>>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn events_for(&self, generation: u64) -> Vec<Recorded> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(g, _)| *g == generation)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Recorded) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl PipelineLog for RecordingLog {
    fn record(&self, generation: u64, event: StageEvent<'_>) {
        let recorded = match event {
            StageEvent::Run { stage } => Recorded::Run(stage.to_string()),
            StageEvent::Done { stage, .. } => Recorded::Done(stage.to_string()),
            StageEvent::Fail { stage, .. } => Recorded::Fail(stage.to_string()),
            StageEvent::Exit { stage, code } => Recorded::Exit(stage.to_string(), code),
            StageEvent::Kill { stage } => Recorded::Kill(stage.to_string()),
        };
        self.events.lock().unwrap().push((generation, recorded));
    }
}
