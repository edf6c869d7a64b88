// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::cli::CliArgs;
use crate::config::Config;
use crate::engine::Orchestrator;
use crate::exec::{PipelineOptions, RealPipelineBackend};
use crate::fs::{FileSystem, RealFileSystem};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution (CLI + optional TOML file)
/// - the polling watcher
/// - the pipeline backend
/// - the orchestrator loop
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = config::resolve(&args)?;
    log_options(&cfg);

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let (watcher, changes) = watch::spawn_watcher(&cfg.watch, fs)?;

    let options = PipelineOptions {
        dir: cfg.pipeline.dir.clone(),
        ..PipelineOptions::default()
    };
    let backend = RealPipelineBackend::new(cfg.pipeline.stages.clone(), options);

    Orchestrator::new(backend, changes)
        .with_watcher(watcher)
        .run(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn log_options(cfg: &Config) {
    debug!(
        interval = ?cfg.watch.interval,
        recurse = cfg.watch.recurse,
        monitor = ?cfg.watch.monitor,
        ignore = ?cfg.watch.ignore,
        care = ?cfg.watch.care,
        "watch options"
    );
    for stage in &cfg.pipeline.stages {
        debug!(%stage, "stage");
    }
}

/// Simple dry-run output: print options and stages.
fn print_dry_run(cfg: &Config) {
    println!("watchrun dry-run");
    println!("  interval   : {:?}", cfg.watch.interval);
    println!("  recursive  : {}", cfg.watch.recurse);
    println!("  monitoring : {:?}", cfg.watch.monitor);
    println!("  ignoring   : {:?}", cfg.watch.ignore);
    println!("  caring     : {:?}", cfg.watch.care);
    if let Some(dir) = &cfg.pipeline.dir {
        println!("  dir        : {}", dir.display());
    }
    println!();

    println!("stages ({}):", cfg.pipeline.stages.len());
    for stage in &cfg.pipeline.stages {
        println!("  - {stage}");
    }
}
