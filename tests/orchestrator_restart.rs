// tests/orchestrator_restart.rs
mod common;
use crate::common::builders::WatchSettingsBuilder;
use crate::common::{init_tracing, mock_fs, p, wait_until, with_timeout};

use std::error::Error;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use watchrun::engine::Orchestrator;
use watchrun::fs::mock::mtime;
use watchrun::types::ChangeKind;
use watchrun::watch::{spawn_watcher, Change, ChangeBatch};
use watchrun_test_utils::fake_backend::{BackendEvent, FakeBackend};

type TestResult = Result<(), Box<dyn Error>>;

fn batch(path: &str) -> ChangeBatch {
    ChangeBatch::new(vec![Change::new(ChangeKind::Modify, p(path), mtime(1))])
}

#[tokio::test]
async fn each_batch_kills_then_relaunches() -> TestResult {
    init_tracing();
    let backend = FakeBackend::new();
    let (tx, rx) = mpsc::channel(1);

    let orchestrator = Orchestrator::new(backend.clone(), rx);
    let task = tokio::spawn(orchestrator.run(std::future::pending()));

    for path in ["a.rs", "b.rs", "c.rs"] {
        tx.send(batch(path)).await?;
    }
    drop(tx);
    with_timeout(task).await??;

    use BackendEvent::*;
    assert_eq!(
        backend.events(),
        vec![Launched(1), Killed(1), Launched(2), Killed(2), Launched(3), Killed(3)]
    );
    assert_eq!(backend.max_live(), 1);
    assert_eq!(backend.live(), 0);
    Ok(())
}

#[tokio::test]
async fn empty_batches_do_not_restart() -> TestResult {
    init_tracing();
    let backend = FakeBackend::new();
    let (tx, rx) = mpsc::channel(1);
    let task = tokio::spawn(Orchestrator::new(backend.clone(), rx).run(std::future::pending()));

    tx.send(batch("a.rs")).await?;
    tx.send(ChangeBatch::default()).await?;
    tx.send(ChangeBatch::default()).await?;
    drop(tx);
    with_timeout(task).await??;

    assert_eq!(backend.launches(), vec![1]);
    assert_eq!(backend.kill_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn closed_stream_without_batches_launches_nothing() -> TestResult {
    let backend = FakeBackend::new();
    let (tx, rx) = mpsc::channel::<ChangeBatch>(1);
    drop(tx);

    with_timeout(Orchestrator::new(backend.clone(), rx).run(std::future::pending())).await?;
    assert!(backend.events().is_empty());
    Ok(())
}

#[tokio::test]
async fn shutdown_without_watcher_kills_and_returns() -> TestResult {
    init_tracing();
    let backend = FakeBackend::new();
    let (tx, rx) = mpsc::channel(1);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(Orchestrator::new(backend.clone(), rx).run(async {
        let _ = stop_rx.await;
    }));

    tx.send(batch("a.rs")).await?;
    let probe = backend.clone();
    wait_until(Duration::from_secs(2), "first launch", || probe.launches().len() == 1).await;

    let _ = stop_tx.send(());
    with_timeout(task).await??;

    assert_eq!(backend.events(), vec![BackendEvent::Launched(1), BackendEvent::Killed(1)]);
    assert_eq!(backend.kill_calls(), 1);
    // Returned while the sender was still alive.
    assert!(tx.is_closed());
    Ok(())
}

#[tokio::test]
async fn watcher_driven_restarts_and_shutdown() -> TestResult {
    init_tracing();
    let (fs, dyn_fs) = mock_fs();
    fs.add_file("src/main.rs", mtime(10));

    let settings = WatchSettingsBuilder::new().monitor("src").build();
    let (watcher, changes) = spawn_watcher(&settings, dyn_fs)?;

    let backend = FakeBackend::new();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(
        Orchestrator::new(backend.clone(), changes)
            .with_watcher(watcher.clone())
            .run(async {
                let _ = stop_rx.await;
            }),
    );

    let probe = backend.clone();
    wait_until(Duration::from_secs(2), "initial launch", || probe.launches() == vec![1]).await;

    fs.touch("src/main.rs", mtime(11));
    wait_until(Duration::from_secs(2), "relaunch", || probe.launches() == vec![1, 2]).await;

    let _ = stop_tx.send(());
    with_timeout(task).await??;

    assert!(watcher.is_stopped());
    assert_eq!(backend.max_live(), 1);
    assert_eq!(backend.live(), 0);
    assert_eq!(backend.events().last(), Some(&BackendEvent::Killed(2)));
    Ok(())
}

#[cfg(unix)]
mod real_processes {
    use super::*;

    use std::path::Path;
    use std::sync::Arc;

    use tempfile::tempdir;
    use watchrun::exec::{OutputTarget, PipelineOptions, RealPipelineBackend};
    use watchrun_test_utils::builders::sh;
    use watchrun_test_utils::recording_log::{Recorded, RecordingLog};

    fn runs(dir: &Path) -> usize {
        std::fs::read_to_string(dir.join("runs.log"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    /// A build-then-serve chain, restarted on every batch.
    #[tokio::test]
    async fn superseded_server_is_killed_before_the_next_build() -> TestResult {
        init_tracing();
        let dir = tempdir()?;
        let log = RecordingLog::new();
        let (out_tx, _out_rx) = mpsc::channel(64);

        let options = PipelineOptions {
            dir: Some(dir.path().to_path_buf()),
            output: OutputTarget::Channel(out_tx),
            log: Arc::new(log.clone()),
            ..PipelineOptions::default()
        };
        let build = sh("echo built > artifact");
        let serve = sh("cat artifact; echo run >> runs.log; sleep 30");
        let backend = RealPipelineBackend::new(vec![build.clone(), serve.clone()], options);

        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(Orchestrator::new(backend, rx).run(std::future::pending()));

        tx.send(batch("main.go")).await?;
        wait_until(Duration::from_secs(3), "first server", || runs(dir.path()) == 1).await;

        tx.send(batch("main.go")).await?;
        wait_until(Duration::from_secs(3), "second server", || runs(dir.path()) == 2).await;

        drop(tx);
        with_timeout(task).await??;

        for generation in [1, 2] {
            assert_eq!(
                log.events_for(generation),
                vec![
                    Recorded::Run(build.to_string()),
                    Recorded::Done(build.to_string()),
                    Recorded::Run(serve.to_string()),
                    Recorded::Kill(serve.to_string()),
                ],
                "generation {generation}"
            );
        }
        Ok(())
    }
}
