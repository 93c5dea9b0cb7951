//! In-memory cache of loaded modules, keyed by absolute path and validated
//! by modification time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

/// A module loaded from `absolute_path` when the file had `mtime`.
#[derive(Debug, Clone)]
pub struct ResolvedModule<M> {
    pub absolute_path: PathBuf,
    pub mtime: SystemTime,
    pub module: M,
}

/// Loaded modules by absolute path. Entries are superseded on reload and
/// evicted only by [`clear`](Self::clear).
#[derive(Debug)]
pub struct ModuleCache<M> {
    entries: RwLock<HashMap<PathBuf, ResolvedModule<M>>>,
}

impl<M> Default for ModuleCache<M> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<M: Clone> ModuleCache<M> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached module for `path`, only if it was loaded at exactly `mtime`.
    pub fn get(&self, path: &Path, mtime: SystemTime) -> Option<M> {
        let entries = self.entries.read().unwrap();
        entries
            .get(path)
            .filter(|entry| entry.mtime == mtime)
            .map(|entry| entry.module.clone())
    }

    /// Record `module` as the current load of `path`.
    pub fn insert(&self, path: PathBuf, mtime: SystemTime, module: M) {
        let entry = ResolvedModule {
            absolute_path: path.clone(),
            mtime,
            module,
        };
        self.entries.write().unwrap().insert(path, entry);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
