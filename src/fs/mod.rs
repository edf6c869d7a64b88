// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::debug;

pub mod mock;

/// What kind of entry a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    /// Sockets, FIFOs, devices.
    Other,
}

/// The slice of file metadata the snapshot builder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub kind: EntryKind,
    pub modified: SystemTime,
}

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// Metadata for `path`, following symlinks.
    fn metadata(&self, path: &Path) -> Result<FileMeta>;

    /// Metadata for `path` itself; a symlink reports [`EntryKind::Symlink`].
    fn symlink_metadata(&self, path: &Path) -> Result<FileMeta>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn metadata(&self, path: &Path) -> Result<FileMeta> {
        let meta = fs::metadata(path).with_context(|| format!("stat {:?}", path))?;
        Ok(to_file_meta(&meta))
    }

    fn symlink_metadata(&self, path: &Path) -> Result<FileMeta> {
        let meta = fs::symlink_metadata(path).with_context(|| format!("lstat {:?}", path))?;
        Ok(to_file_meta(&meta))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            match entry {
                Ok(entry) => entries.push(entry.path()),
                Err(err) => debug!(dir = ?path, error = %err, "skipping unreadable entry"),
            }
        }
        Ok(entries)
    }
}

fn to_file_meta(meta: &fs::Metadata) -> FileMeta {
    let ft = meta.file_type();
    let kind = if ft.is_symlink() {
        EntryKind::Symlink
    } else if ft.is_dir() {
        EntryKind::Dir
    } else if ft.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    };

    FileMeta {
        kind,
        // Platforms without mtime support report the epoch; such files then
        // only ever show up as create/delete.
        modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
    }
}
