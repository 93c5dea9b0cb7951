pub mod cache;
pub mod load;
pub mod lock;
pub mod transform;
pub mod version;

use ondemand_core::paths::{absolutize, project_root};
use ondemand_core::{Config, Error, LoaderConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Error body shared by every `--json` result.
#[derive(Serialize)]
pub struct ErrorJson {
    pub code: &'static str,
    pub message: String,
    /// Code of the innermost failure when it differs from `code`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_code: Option<&'static str>,
}

impl From<&Error> for ErrorJson {
    fn from(err: &Error) -> Self {
        let root = err.root_cause().code();
        Self {
            code: err.code(),
            message: err.to_string(),
            root_code: (root != err.code()).then_some(root),
        }
    }
}

/// Project root for the working directory: the nearest ancestor with a
/// `package.json` or `.git`, else the directory itself.
pub fn resolve_project_root(config: &Config) -> PathBuf {
    project_root(&config.cwd).unwrap_or_else(|| config.cwd.clone())
}

/// Loader configuration for the project containing the working directory.
pub fn loader_config(config: &Config) -> Result<LoaderConfig, Error> {
    LoaderConfig::load(&resolve_project_root(config))
}

/// Entry path as given on the command line, made absolute against the cwd.
pub fn entry_path(config: &Config, entry: &Path) -> PathBuf {
    absolutize(entry, &config.cwd)
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("error: failed to serialize output: {e}"),
    }
}
