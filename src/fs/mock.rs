// src/fs/mock.rs

use super::{EntryKind, FileMeta, FileSystem};
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { modified: SystemTime },
    Dir,
    Symlink { target: PathBuf },
    Other,
}

#[derive(Debug, Default)]
struct MockState {
    entries: BTreeMap<PathBuf, MockEntry>,
    unreadable: HashSet<PathBuf>,
}

/// In-memory filesystem with explicit modification times.
///
/// Paths are stored in a cleaned form (no leading `./`), so `"proj/a.txt"`
/// and `"./proj/a.txt"` refer to the same entry. Parent directories are
/// created implicitly.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

/// `UNIX_EPOCH + secs`, handy for readable test timestamps.
pub fn mtime(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.lock().entries.insert(PathBuf::from("."), MockEntry::Dir);
        fs
    }

    /// Create or overwrite a regular file with the given modification time.
    pub fn add_file(&self, path: impl AsRef<Path>, modified: SystemTime) {
        self.insert(path.as_ref(), MockEntry::File { modified });
    }

    /// Alias for [`add_file`](Self::add_file) that reads better in tests.
    pub fn touch(&self, path: impl AsRef<Path>, modified: SystemTime) {
        self.add_file(path, modified);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Dir);
    }

    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let target = clean(target.as_ref());
        self.insert(path.as_ref(), MockEntry::Symlink { target });
    }

    /// Add a special file (socket, FIFO, ...).
    pub fn add_special(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Other);
    }

    /// Remove an entry and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let key = clean(path.as_ref());
        let mut state = self.lock();
        state
            .entries
            .retain(|p, _| p != &key && !p.starts_with(&key));
    }

    /// Make `read_dir` fail for this directory.
    pub fn deny_read(&self, path: impl AsRef<Path>) {
        self.lock().unreadable.insert(clean(path.as_ref()));
    }

    pub fn allow_read(&self, path: impl AsRef<Path>) {
        self.lock().unreadable.remove(&clean(path.as_ref()));
    }

    fn insert(&self, path: &Path, entry: MockEntry) {
        let key = clean(path);
        let mut state = self.lock();
        let mut parent = key.parent();
        while let Some(dir) = parent {
            let dir_key = if dir.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                dir.to_path_buf()
            };
            state.entries.entry(dir_key).or_insert(MockEntry::Dir);
            parent = dir.parent();
        }
        state.entries.insert(key, entry);
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Follow symlinks in `path` itself to the key of the final entry.
    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let mut current = clean(path);
        for _ in 0..32 {
            match self.lookup(&current) {
                Ok(MockEntry::Symlink { target }) => current = target,
                _ => return Ok(current),
            }
        }
        Err(anyhow!("too many levels of symbolic links: {:?}", path))
    }

    fn lookup(&self, path: &Path) -> Result<MockEntry> {
        self.lock()
            .entries
            .get(&clean(path))
            .cloned()
            .ok_or_else(|| anyhow!("no such file or directory: {:?}", path))
    }
}

impl FileSystem for MockFileSystem {
    fn metadata(&self, path: &Path) -> Result<FileMeta> {
        let mut current = path.to_path_buf();
        // Bounded so a symlink loop surfaces as an error instead of hanging.
        for _ in 0..32 {
            match self.lookup(&current)? {
                MockEntry::Symlink { target } => current = target,
                entry => return Ok(meta_for(&entry)),
            }
        }
        Err(anyhow!("too many levels of symbolic links: {:?}", path))
    }

    fn symlink_metadata(&self, path: &Path) -> Result<FileMeta> {
        Ok(meta_for(&self.lookup(path)?))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let key = self.resolve(path)?;
        let state = self.lock();
        if state.unreadable.contains(&key) {
            return Err(anyhow!("permission denied: {:?}", path));
        }
        match state.entries.get(&key) {
            Some(MockEntry::Dir) => {}
            Some(_) => return Err(anyhow!("not a directory: {:?}", path)),
            None => return Err(anyhow!("no such file or directory: {:?}", path)),
        }

        let is_root = key == Path::new(".");
        let children = state
            .entries
            .keys()
            .filter(|p| *p != &key)
            .filter(|p| match p.parent() {
                Some(parent) if is_root => parent.as_os_str().is_empty(),
                Some(parent) => parent == key,
                None => false,
            })
            .filter_map(|p| p.file_name().map(|name| path.join(name)))
            .collect();
        Ok(children)
    }
}

fn meta_for(entry: &MockEntry) -> FileMeta {
    match entry {
        MockEntry::File { modified } => FileMeta {
            kind: EntryKind::File,
            modified: *modified,
        },
        MockEntry::Dir => FileMeta {
            kind: EntryKind::Dir,
            modified: UNIX_EPOCH,
        },
        MockEntry::Symlink { .. } => FileMeta {
            kind: EntryKind::Symlink,
            modified: UNIX_EPOCH,
        },
        MockEntry::Other => FileMeta {
            kind: EntryKind::Other,
            modified: UNIX_EPOCH,
        },
    }
}

/// Drop `.` components so equivalent spellings share one key.
fn clean(path: &Path) -> PathBuf {
    let cleaned: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}
