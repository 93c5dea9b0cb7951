//! Framework dependency lock.
//!
//! Records the canonical on-disk location of the UI runtime and its renderer
//! so that every generated shim seeds the shared instance from the same file.

use crate::resolver::ModuleResolver;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// Canonical paths of the shared framework packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkLock {
    /// Entry file of the UI runtime package.
    pub ui_runtime_path: Option<PathBuf>,
    /// Entry file of the renderer package.
    pub renderer_path: Option<PathBuf>,
}

impl FrameworkLock {
    /// Whether neither package was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ui_runtime_path.is_none() && self.renderer_path.is_none()
    }
}

/// Holder for the current [`FrameworkLock`]. The last call to [`lock`](Self::lock) wins.
#[derive(Debug, Default)]
pub struct FrameworkLockRegistry {
    current: RwLock<FrameworkLock>,
}

impl FrameworkLockRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `ui_runtime` and `renderer` from `project_root` and record
    /// their canonical paths. A package that does not resolve leaves its
    /// slot unset.
    pub fn lock(
        &self,
        project_root: &Path,
        resolver: &dyn ModuleResolver,
        ui_runtime: &str,
        renderer: &str,
        debug: bool,
    ) -> FrameworkLock {
        let canonical = |name: &str| {
            let path = resolver
                .resolve(name, project_root)
                .map(|p| dunce::canonicalize(&p).unwrap_or(p));
            if debug {
                match &path {
                    Some(p) => debug!(package = name, path = %p.display(), "locked framework dependency"),
                    None => debug!(package = name, root = %project_root.display(), "framework dependency not found"),
                }
            }
            path
        };

        let lock = FrameworkLock {
            ui_runtime_path: canonical(ui_runtime),
            renderer_path: canonical(renderer),
        };

        *self.current.write().unwrap() = lock.clone();
        lock
    }

    /// Snapshot of the current lock.
    #[must_use]
    pub fn get(&self) -> FrameworkLock {
        self.current.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapResolver(HashMap<&'static str, PathBuf>);

    impl ModuleResolver for MapResolver {
        fn resolve(&self, spec: &str, _base_dir: &Path) -> Option<PathBuf> {
            self.0.get(spec).cloned()
        }
    }

    #[test]
    fn test_lock_records_paths() {
        let dir = tempfile::tempdir().unwrap();
        let react = dir.path().join("react.js");
        std::fs::write(&react, "").unwrap();

        let resolver = MapResolver(HashMap::from([("react", react.clone())]));
        let registry = FrameworkLockRegistry::new();
        assert!(registry.get().is_empty());

        let lock = registry.lock(dir.path(), &resolver, "react", "react-dom", false);
        assert_eq!(lock.ui_runtime_path, Some(dunce::canonicalize(&react).unwrap()));
        assert_eq!(lock.renderer_path, None);
        assert_eq!(registry.get(), lock);
    }

    #[test]
    fn test_last_lock_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.js");
        let second = dir.path().join("b.js");
        std::fs::write(&first, "").unwrap();
        std::fs::write(&second, "").unwrap();

        let registry = FrameworkLockRegistry::new();
        registry.lock(
            dir.path(),
            &MapResolver(HashMap::from([("react", first)])),
            "react",
            "react-dom",
            false,
        );
        registry.lock(
            dir.path(),
            &MapResolver(HashMap::from([("react", second.clone())])),
            "react",
            "react-dom",
            true,
        );

        assert_eq!(
            registry.get().ui_runtime_path,
            Some(dunce::canonicalize(&second).unwrap())
        );
    }
}
