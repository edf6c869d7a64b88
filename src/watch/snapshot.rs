// src/watch/snapshot.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, trace};

use crate::config::WatchSettings;
use crate::errors::Result;
use crate::fs::{EntryKind, FileSystem};
use crate::types::ChangeKind;
use crate::watch::path_utils::{base_name, normalize, to_slash};
use crate::watch::patterns::{MonitorSpec, NameFilter};

/// Point-in-time mapping of monitored regular files to their modification
/// time.
///
/// Two snapshots are equal when they have the same key set and every key has
/// an identical modification time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<PathBuf, SystemTime>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<SystemTime> {
        self.files.get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, SystemTime)> {
        self.files.iter().map(|(p, t)| (p.as_path(), *t))
    }

    /// Differences going from `self` (previous) to `next`.
    ///
    /// Deletes carry the old modification time, modifies and creates the new
    /// one. Deletes and modifies come first, in path order, then creates.
    pub fn diff(&self, next: &Snapshot) -> ChangeBatch {
        let mut changes = Vec::new();

        for (path, &old) in &self.files {
            match next.files.get(path) {
                None => changes.push(Change::new(ChangeKind::Delete, path.clone(), old)),
                Some(&new) if new != old => {
                    changes.push(Change::new(ChangeKind::Modify, path.clone(), new))
                }
                Some(_) => {}
            }
        }

        for (path, &new) in &next.files {
            if !self.files.contains_key(path) {
                changes.push(Change::new(ChangeKind::Create, path.clone(), new));
            }
        }

        ChangeBatch::new(changes)
    }

    fn record(&mut self, path: PathBuf, modified: SystemTime) {
        self.files.insert(path, modified);
    }
}

impl FromIterator<(PathBuf, SystemTime)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (PathBuf, SystemTime)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// One observed difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl Change {
    pub fn new(kind: ChangeKind, path: PathBuf, modified: SystemTime) -> Self {
        Self {
            kind,
            path,
            modified,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path.display())
    }
}

/// All changes derived from one diff, delivered as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    changes: Vec<Change>,
}

impl ChangeBatch {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn as_slice(&self) -> &[Change] {
        &self.changes
    }

    /// Number of changes of the given kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}

impl IntoIterator for ChangeBatch {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeBatch {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Builds [`Snapshot`]s for a fixed set of monitor specs.
///
/// Traversal policy:
/// - Monitor roots given literally are resolved following symlinks, and are
///   never subject to the ignore list.
/// - Entries found while walking are inspected without following symlinks.
///   Symlinks are neither recorded nor traversed; neither are special files.
/// - An unreadable directory or a vanished entry is skipped, never fatal.
pub struct SnapshotBuilder {
    fs: Arc<dyn FileSystem>,
    specs: Vec<MonitorSpec>,
    filter: NameFilter,
    recurse: bool,
}

impl fmt::Debug for SnapshotBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotBuilder")
            .field("specs", &self.specs)
            .field("filter", &self.filter)
            .field("recurse", &self.recurse)
            .finish_non_exhaustive()
    }
}

impl SnapshotBuilder {
    pub fn new(fs: Arc<dyn FileSystem>, settings: &WatchSettings) -> Result<Self> {
        let specs = settings
            .monitor
            .iter()
            .map(|s| MonitorSpec::parse(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            fs,
            specs,
            filter: NameFilter::new(&settings.ignore, &settings.care)?,
            recurse: settings.recurse,
        })
    }

    /// Walk every monitor spec and collect a fresh snapshot.
    pub fn build(&self) -> Snapshot {
        let mut snap = Snapshot::new();
        for spec in &self.specs {
            match spec {
                MonitorSpec::Path(path) => self.include_path(&mut snap, path),
                MonitorSpec::Glob {
                    base,
                    matcher,
                    max_depth,
                    ..
                } => self.include_glob(&mut snap, base, matcher, *max_depth, 1),
            }
        }
        trace!(files = snap.len(), "snapshot built");
        snap
    }

    fn include_path(&self, snap: &mut Snapshot, path: &Path) {
        let meta = match self.fs.metadata(path) {
            Ok(meta) => meta,
            Err(err) => {
                debug!(path = ?path, error = %err, "monitored path not readable; skipping");
                return;
            }
        };

        match meta.kind {
            EntryKind::Dir => self.include_dir(snap, path),
            EntryKind::File => self.record(snap, path, meta.modified),
            _ => {}
        }
    }

    fn include_dir(&self, snap: &mut Snapshot, dir: &Path) {
        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = ?dir, error = %err, "cannot read directory; skipping subtree");
                return;
            }
        };

        for path in entries {
            let Some(name) = base_name(&path) else { continue };
            if self.filter.is_ignored(&name) {
                trace!(path = ?path, "ignored");
                continue;
            }

            let Ok(meta) = self.fs.symlink_metadata(&path) else {
                continue;
            };

            match meta.kind {
                EntryKind::Dir if self.recurse => self.include_dir(snap, &path),
                EntryKind::File => self.record(snap, &path, meta.modified),
                _ => {}
            }
        }
    }

    fn include_glob(
        &self,
        snap: &mut Snapshot,
        dir: &Path,
        matcher: &globset::GlobMatcher,
        max_depth: Option<usize>,
        depth: usize,
    ) {
        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = ?dir, error = %err, "cannot read directory; skipping subtree");
                return;
            }
        };

        for path in entries {
            let Some(name) = base_name(&path) else { continue };
            if self.filter.is_ignored(&name) {
                continue;
            }

            let Ok(meta) = self.fs.symlink_metadata(&path) else {
                continue;
            };

            if matcher.is_match(to_slash(&normalize(&path))) {
                match meta.kind {
                    EntryKind::Dir => self.include_dir(snap, &path),
                    EntryKind::File => self.record(snap, &path, meta.modified),
                    _ => {}
                }
                continue;
            }

            let deeper = max_depth.is_none_or(|max| depth < max);
            if meta.kind == EntryKind::Dir && deeper {
                self.include_glob(snap, &path, matcher, max_depth, depth + 1);
            }
        }
    }

    fn record(&self, snap: &mut Snapshot, path: &Path, modified: SystemTime) {
        let key = normalize(path);
        let name = base_name(&key).unwrap_or_default();
        if self.filter.cares(&name, &to_slash(&key)) {
            snap.record(key, modified);
        }
    }
}
