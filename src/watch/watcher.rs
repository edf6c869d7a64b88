// src/watch/watcher.rs

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatchSettings;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::watch::snapshot::{ChangeBatch, Snapshot, SnapshotBuilder};

/// Lifecycle of a watcher. Transitions only go forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WatcherState {
    Running = 0,
    Stopping = 1,
    Stopped = 2,
}

impl WatcherState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WatcherState::Running,
            1 => WatcherState::Stopping,
            _ => WatcherState::Stopped,
        }
    }
}

struct Shared {
    state: AtomicU8,
    stop: CancellationToken,
}

impl Shared {
    fn state(&self) -> WatcherState {
        WatcherState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Cloneable handle used to stop the poll loop and observe its state.
#[derive(Clone)]
pub struct WatcherHandle {
    shared: Arc<Shared>,
}

impl fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("state", &self.state())
            .finish()
    }
}

impl WatcherHandle {
    fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: AtomicU8::new(WatcherState::Running as u8),
                stop: CancellationToken::new(),
            }),
        }
    }

    /// Request the poll loop to stop.
    ///
    /// Only the first call moves `Running -> Stopping` and returns `true`;
    /// later calls are no-ops. The loop notices within one interval, marks
    /// itself `Stopped` and closes the change channel.
    pub fn stop(&self) -> bool {
        let first = self
            .shared
            .state
            .compare_exchange(
                WatcherState::Running as u8,
                WatcherState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if first {
            info!("stopping watcher");
            self.shared.stop.cancel();
        }
        first
    }

    pub fn state(&self) -> WatcherState {
        self.shared.state()
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == WatcherState::Stopped
    }
}

/// Spawn the polling watcher for `settings`.
///
/// Returns the control handle and the receiving end of the change channel.
/// The channel holds at most one undelivered batch: while it is full the
/// poll loop blocks, so a slow consumer slows the watcher down instead of
/// queueing batches.
pub fn spawn_watcher(
    settings: &WatchSettings,
    fs: Arc<dyn FileSystem>,
) -> Result<(WatcherHandle, mpsc::Receiver<ChangeBatch>)> {
    let builder = Arc::new(SnapshotBuilder::new(fs, settings)?);
    let (tx, rx) = mpsc::channel::<ChangeBatch>(1);
    let handle = WatcherHandle::new();

    let poll = PollLoop {
        builder,
        interval: settings.interval,
        shared: Arc::clone(&handle.shared),
        tx,
    };

    info!(
        monitor = ?settings.monitor,
        interval = ?settings.interval,
        recurse = settings.recurse,
        "watcher started"
    );
    tokio::spawn(poll.run());

    Ok((handle, rx))
}

struct PollLoop {
    builder: Arc<SnapshotBuilder>,
    interval: Duration,
    shared: Arc<Shared>,
    tx: mpsc::Sender<ChangeBatch>,
}

impl PollLoop {
    async fn run(self) {
        debug!("watcher poll loop started");
        let mut previous = Snapshot::new();

        loop {
            if self.shared.state() >= WatcherState::Stopping {
                break;
            }

            if let Some(next) = self.snapshot().await {
                if next != previous {
                    debug!(files = next.len(), "snapshot changed; waiting for it to settle");
                    if !self.pause().await {
                        break;
                    }

                    if let Some(settled) = self.snapshot().await {
                        let batch = previous.diff(&settled);
                        previous = settled;
                        if !self.deliver(batch).await {
                            break;
                        }
                    }
                }
            }

            if !self.pause().await {
                break;
            }
        }

        self.finish();
    }

    /// Build a snapshot off the async workers; `None` if the build panicked.
    async fn snapshot(&self) -> Option<Snapshot> {
        let builder = Arc::clone(&self.builder);
        match tokio::task::spawn_blocking(move || builder.build()).await {
            Ok(snap) => Some(snap),
            Err(err) => {
                warn!(error = %err, "snapshot task failed; skipping this poll");
                None
            }
        }
    }

    /// Sleep one interval. Returns `false` if a stop was requested.
    async fn pause(&self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.interval) => self.shared.state() == WatcherState::Running,
            _ = self.shared.stop.cancelled() => false,
        }
    }

    /// Blocking send of one batch. Returns `false` if the loop should end.
    async fn deliver(&self, batch: ChangeBatch) -> bool {
        debug!(changes = batch.len(), "emitting change batch");
        tokio::select! {
            biased;
            sent = self.tx.send(batch) => match sent {
                Ok(()) => true,
                Err(_) => {
                    debug!("change receiver dropped; stopping watcher");
                    false
                }
            },
            _ = self.shared.stop.cancelled() => {
                debug!("stop requested while a batch was pending; dropping it");
                false
            }
        }
    }

    /// Mark the watcher stopped, then close the channel.
    fn finish(self) {
        self.shared
            .state
            .store(WatcherState::Stopped as u8, Ordering::Release);
        drop(self.tx);
        info!("watcher stopped");
    }
}
