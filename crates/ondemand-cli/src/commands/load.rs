//! `ondemand load` command implementation.

use super::{entry_path, loader_config, print_json, resolve_project_root, ErrorJson};
use miette::{IntoDiagnostic, Result};
use ondemand_core::{Config, Error, JsonlCapture, ModuleLoader, NodeHost, NodeModule};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Serialize)]
struct LoadResultJson {
    ok: bool,
    entry: String,
    exports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
}

pub fn run(config: &Config, entry: &Path, node: Option<&Path>, json: bool) -> Result<()> {
    let entry = entry_path(config, entry);

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let (result, diagnostics) = runtime.block_on(load(config, &entry, node));

    match result {
        Ok(module) => {
            if json {
                print_json(&LoadResultJson {
                    ok: true,
                    entry: entry.display().to_string(),
                    exports: module.exports,
                    diagnostics,
                    error: None,
                });
            } else {
                println!("loaded {}", entry.display());
                for name in &module.exports {
                    println!("  export {name}");
                }
            }
            Ok(())
        }
        Err(e) => {
            if json {
                print_json(&LoadResultJson {
                    ok: false,
                    entry: entry.display().to_string(),
                    exports: Vec::new(),
                    diagnostics,
                    error: Some(ErrorJson::from(&e)),
                });
                std::process::exit(1);
            }
            if let Some(path) = diagnostics {
                eprintln!("hint: failure recorded in {path}");
            }
            Err(e).into_diagnostic()
        }
    }
}

/// Returns the load result and, in debug mode, the diagnostics log path.
async fn load(
    config: &Config,
    entry: &Path,
    node: Option<&Path>,
) -> (Result<NodeModule, Error>, Option<String>) {
    let loader_config = match loader_config(config) {
        Ok(c) => c,
        Err(e) => return (Err(e), None),
    };
    let host = match node {
        Some(binary) => NodeHost::with_binary(binary),
        None => match NodeHost::discover() {
            Ok(host) => host,
            Err(e) => return (Err(e), None),
        },
    };

    let capture = config
        .debug
        .then(|| Arc::new(JsonlCapture::in_cache_dir(&loader_config.cache_dir())));
    let diagnostics = capture
        .as_ref()
        .map(|c| c.path().display().to_string());

    let mut loader = ModuleLoader::new(loader_config, host);
    if let Some(capture) = capture {
        loader = loader.with_diagnostics(capture);
    }

    let root: PathBuf = resolve_project_root(config);
    loader.lock_framework_dependencies(&root, config.debug);

    (loader.load(entry, config.debug).await, diagnostics)
}
