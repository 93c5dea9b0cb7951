use crate::compiler::EsTarget;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional per-project config file.
pub const CONFIG_FILE: &str = "ondemand.json";

/// Default project-local cache directory name.
pub const CACHE_DIR_NAME: &str = ".ondemand";

/// Runtime configuration for the ondemand CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Debug mode: verbose resolution logs, retained temp files, diagnostics capture.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Set debug mode.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Loader configuration for one project.
///
/// Every field has a default, so an `ondemand.json` only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderConfig {
    /// Project root. Relative entry paths and the root alias resolve against it.
    #[serde(skip)]
    pub project_root: PathBuf,
    /// Cache directory for temporary and dependency files.
    /// Relative values are taken from the project root.
    pub cache_dir: PathBuf,
    /// Prefix that addresses the project root (`@/components/Button`).
    pub root_alias: String,
    /// UI runtime package shared across the whole graph.
    pub ui_runtime: String,
    /// DOM renderer counterpart of the UI runtime.
    pub renderer: String,
    /// Native platform package rewritten to its web polyfill.
    pub native_platform: String,
    /// Web polyfill for the native platform package.
    pub native_polyfill: String,
    /// Package name under which the framework imports itself.
    pub framework_name: String,
    /// Deprecated names still accepted for the framework (with a warning).
    pub legacy_framework_names: Vec<String>,
    /// Installed framework directory. Discovered under `node_modules` when unset.
    pub framework_root: Option<PathBuf>,
    /// JSX factory call for element creation.
    pub jsx_factory: String,
    /// JSX fragment symbol.
    pub jsx_fragment: String,
    /// Global slot holding the shared UI runtime instance.
    pub runtime_slot: String,
    /// Global slot holding the shared renderer instance.
    pub renderer_slot: String,
    /// ECMAScript target for emitted code.
    pub target: EsTarget,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            cache_dir: PathBuf::from(CACHE_DIR_NAME),
            root_alias: "@/".to_string(),
            ui_runtime: "react".to_string(),
            renderer: "react-dom".to_string(),
            native_platform: "react-native".to_string(),
            native_polyfill: "react-native-web".to_string(),
            framework_name: "ondemand".to_string(),
            legacy_framework_names: vec!["ondemand-react".to_string()],
            framework_root: None,
            jsx_factory: "React.createElement".to_string(),
            jsx_fragment: "React.Fragment".to_string(),
            runtime_slot: "__ONDEMAND_REACT__".to_string(),
            renderer_slot: "__ONDEMAND_REACT_DOM__".to_string(),
            target: EsTarget::default(),
        }
    }
}

impl LoaderConfig {
    /// Default configuration rooted at `project_root`.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Default::default()
        }
    }

    /// Load `ondemand.json` from the project root, or fall back to defaults.
    pub fn load(project_root: &Path) -> Result<Self, Error> {
        let path = project_root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::new(project_root));
        }

        let content = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let mut config: Self =
            serde_json::from_str(&content).map_err(|source| Error::ConfigParse { path, source })?;
        config.project_root = project_root.to_path_buf();
        Ok(config)
    }

    /// Absolute cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        if self.cache_dir.is_absolute() {
            self.cache_dir.clone()
        } else {
            self.project_root.join(&self.cache_dir)
        }
    }

    /// Root identifier of the JSX factory (`React` for `React.createElement`).
    #[must_use]
    pub fn factory_root(&self) -> &str {
        self.jsx_factory
            .split('.')
            .next()
            .unwrap_or(&self.jsx_factory)
    }

    /// Set the cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the framework root.
    #[must_use]
    pub fn with_framework_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.framework_root = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_loader_config_defaults() {
        let config = LoaderConfig::new("/project");
        assert_eq!(config.cache_dir(), PathBuf::from("/project/.ondemand"));
        assert_eq!(config.factory_root(), "React");
        assert_eq!(config.root_alias, "@/");
        assert_eq!(config.legacy_framework_names, vec!["ondemand-react"]);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = LoaderConfig::load(dir.path()).unwrap();
        assert_eq!(config.project_root, dir.path());
        assert_eq!(config.ui_runtime, "react");
    }

    #[test]
    fn test_load_partial_override() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "jsxFactory": "h", "jsxFragment": "Fragment", "cacheDir": "/tmp/od" }"#,
        )
        .unwrap();

        let config = LoaderConfig::load(dir.path()).unwrap();
        assert_eq!(config.jsx_factory, "h");
        assert_eq!(config.factory_root(), "h");
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/od"));
        assert_eq!(config.renderer, "react-dom");
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();

        let err = LoaderConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }
}
