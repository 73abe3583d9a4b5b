//! Resource stores: existence, modification time and source text.
//!
//! Modification times are compared with `>` only, so any monotonic
//! `SystemTime` source works. Missing resources are never an error here;
//! callers skip them until they reappear.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::SystemTime;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Named resources the supervisor can watch and load.
pub trait ResourceStore {
    fn exists(&self, name: &str) -> bool;

    /// Last modification time. Only meaningful when [`exists`](Self::exists).
    fn modified(&self, name: &str) -> Option<SystemTime>;

    /// Full source text of a resource.
    fn read(&self, name: &str) -> io::Result<String>;
}

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

// ============================================================================
// DiskStore
// ============================================================================

/// Resources are files below a root directory; names are relative paths.
///
/// A store created with [`DiskStore::watched`] keeps an mtime cache that a
/// `notify` watcher invalidates, so per-tick polling does not stat every file.
pub struct DiskStore {
    root: PathBuf,
    cache: Option<Mutex<MtimeCache>>,
}

struct MtimeCache {
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<notify::Event>>,
    entries: FxHashMap<PathBuf, Option<SystemTime>>,
}

impl DiskStore {
    /// Store that stats files on every query.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: canonical(root.as_ref()),
            cache: None,
        }
    }

    /// Store with a watcher-invalidated mtime cache.
    pub fn watched(root: impl AsRef<Path>) -> notify::Result<Self> {
        let root = canonical(root.as_ref());
        let (tx, rx) = mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        crate::debug!("watch"; "watching {}", root.display());

        Ok(Self {
            root,
            cache: Some(Mutex::new(MtimeCache {
                _watcher: watcher,
                events: rx,
                entries: FxHashMap::default(),
            })),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl MtimeCache {
    /// Drop cached entries for every path the watcher reported.
    fn invalidate(&mut self) {
        while let Ok(result) = self.events.try_recv() {
            match result {
                Ok(event) if !event.need_rescan() => {
                    for path in &event.paths {
                        self.entries.remove(path);
                    }
                }
                Ok(_) => self.entries.clear(),
                Err(e) => {
                    crate::debug!("watch"; "notify error: {}", e);
                    self.entries.clear();
                }
            }
        }
    }

    fn mtime(&mut self, path: PathBuf) -> Option<SystemTime> {
        self.invalidate();
        *self
            .entries
            .entry(path)
            .or_insert_with_key(|path| get_mtime(path))
    }
}

impl ResourceStore for DiskStore {
    fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    fn modified(&self, name: &str) -> Option<SystemTime> {
        let path = self.path(name);
        match &self.cache {
            Some(cache) => cache.lock().mtime(path),
            None => get_mtime(&path),
        }
    }

    fn read(&self, name: &str) -> io::Result<String> {
        std::fs::read_to_string(self.path(name))
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Shared in-memory store with scriptable timestamps.
///
/// Clones share contents, so a test can edit "files" while the supervisor
/// owns another handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<FxHashMap<String, MemoryEntry>>>,
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    source: String,
    modified: SystemTime,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a resource.
    pub fn write(&self, name: impl Into<String>, source: impl Into<String>, modified: SystemTime) {
        self.entries.lock().insert(
            name.into(),
            MemoryEntry {
                source: source.into(),
                modified,
            },
        );
    }

    /// Set the modification time; creates an empty resource if missing.
    pub fn touch(&self, name: &str, modified: SystemTime) {
        let mut entries = self.entries.lock();
        match entries.get_mut(name) {
            Some(entry) => entry.modified = modified,
            None => {
                entries.insert(
                    name.to_owned(),
                    MemoryEntry {
                        source: String::new(),
                        modified,
                    },
                );
            }
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        self.entries.lock().remove(name).is_some()
    }
}

impl ResourceStore for MemoryStore {
    fn exists(&self, name: &str) -> bool {
        self.entries.lock().contains_key(name)
    }

    fn modified(&self, name: &str) -> Option<SystemTime> {
        self.entries.lock().get(name).map(|e| e.modified)
    }

    fn read(&self, name: &str) -> io::Result<String> {
        self.entries
            .lock()
            .get(name)
            .map(|e| e.source.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no resource `{name}`")))
    }
}
