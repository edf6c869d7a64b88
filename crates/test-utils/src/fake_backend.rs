use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use watchrun::exec::{PipelineBackend, RunningPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    Launched(u64),
    Killed(u64),
}

#[derive(Debug, Default)]
struct FakeState {
    events: Mutex<Vec<BackendEvent>>,
    live: AtomicUsize,
    max_live: AtomicUsize,
    kill_calls: AtomicUsize,
}

/// A fake backend that:
/// - records launches and kills in order
/// - tracks how many generations are "live" (launched and not yet killed)
///   at once, so tests can assert runs never overlap.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.state.events.lock().unwrap().clone()
    }

    pub fn launches(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BackendEvent::Launched(g) => Some(g),
                BackendEvent::Killed(_) => None,
            })
            .collect()
    }

    pub fn live(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.state.max_live.load(Ordering::SeqCst)
    }

    pub fn kill_calls(&self) -> usize {
        self.state.kill_calls.load(Ordering::SeqCst)
    }
}

impl PipelineBackend for FakeBackend {
    fn launch(&mut self, generation: u64) -> Box<dyn RunningPipeline> {
        self.state
            .events
            .lock()
            .unwrap()
            .push(BackendEvent::Launched(generation));
        let live = self.state.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_live.fetch_max(live, Ordering::SeqCst);

        Box::new(FakePipeline {
            generation,
            killed: AtomicBool::new(false),
            state: Arc::clone(&self.state),
        })
    }
}

struct FakePipeline {
    generation: u64,
    killed: AtomicBool,
    state: Arc<FakeState>,
}

impl RunningPipeline for FakePipeline {
    fn generation(&self) -> u64 {
        self.generation
    }

    fn kill(&self) {
        self.state.kill_calls.fetch_add(1, Ordering::SeqCst);
        if !self.killed.swap(true, Ordering::SeqCst) {
            self.state.live.fetch_sub(1, Ordering::SeqCst);
            self.state
                .events
                .lock()
                .unwrap()
                .push(BackendEvent::Killed(self.generation));
        }
    }
}
