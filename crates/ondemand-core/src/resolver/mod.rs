//! Module resolver for JavaScript/TypeScript.
//!
//! The loader asks a [`ModuleResolver`] where a bare specifier lives, scoped
//! to the importing file's directory. [`NodeResolver`] implements Node-style
//! resolution with package.json `exports` and `imports` support.

mod exports;
mod node;

pub use exports::{
    read_package_json, resolve_exports, resolve_exports_pattern, resolve_exports_root,
    resolve_exports_subpath, resolve_imports_map, IMPORT_CONDITIONS,
};
pub use node::{
    parse_bare_specifier, resolve, ResolveContext, ResolveReasonCode, ResolveResult,
    DEFAULT_EXTENSIONS,
};

use std::path::{Path, PathBuf};

/// Resolves a specifier from the scope of a directory.
pub trait ModuleResolver: Send + Sync {
    /// Absolute, symlink-resolved path for `spec` as seen from `base_dir`,
    /// or `None` when nothing matches.
    fn resolve(&self, spec: &str, base_dir: &Path) -> Option<PathBuf>;
}

/// Node-style resolver over the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct NodeResolver {
    _private: (),
}

impl NodeResolver {
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl ModuleResolver for NodeResolver {
    fn resolve(&self, spec: &str, base_dir: &Path) -> Option<PathBuf> {
        let result = resolve(&ResolveContext::new(base_dir), spec);
        if let Some(reason) = result.reason {
            tracing::trace!(spec, base = %base_dir.display(), %reason, tried = result.tried.len(), "unresolved");
        }
        result.resolved
    }
}
