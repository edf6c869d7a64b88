#![allow(dead_code)]

pub use watchrun_test_utils::builders;
pub use watchrun_test_utils::{init_tracing, wait_until, with_timeout};

use std::path::PathBuf;
use std::sync::Arc;

use watchrun::fs::mock::MockFileSystem;
use watchrun::fs::FileSystem;

/// Mock filesystem plus the trait-object handle the builder/watcher expect.
pub fn mock_fs() -> (MockFileSystem, Arc<dyn FileSystem>) {
    let fs = MockFileSystem::new();
    let dyn_fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    (fs, dyn_fs)
}

pub fn p(s: &str) -> PathBuf {
    PathBuf::from(s)
}
