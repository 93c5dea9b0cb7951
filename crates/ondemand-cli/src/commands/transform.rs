//! `ondemand transform` command implementation.
//!
//! Runs the same pipeline as `load` up to the point where the module would
//! be handed to the host, then prints the generated code.

use super::{entry_path, loader_config, print_json, resolve_project_root, ErrorJson};
use miette::{IntoDiagnostic, Result};
use ondemand_core::loader::{CompiledModule, ModuleHost};
use ondemand_core::{Config, Error, ModuleLoader};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use url::Url;

#[derive(Serialize)]
struct TransformResultJson {
    ok: bool,
    entry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    imports: Vec<ImportJson>,
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
}

#[derive(Serialize)]
struct ImportJson {
    specifier: String,
    kind: String,
    rewritten: bool,
}

/// Host that is never asked to import: `transform` stops before loading.
struct NoHost;

impl ModuleHost for NoHost {
    type Module = ();

    fn import(&self, url: &Url) -> impl Future<Output = Result<(), Error>> + Send {
        let url = url.to_string();
        async move {
            Err(Error::Import {
                url,
                message: "transform does not load modules".to_string(),
            })
        }
    }
}

pub fn run(config: &Config, entry: &Path, json: bool) -> Result<()> {
    let entry = entry_path(config, entry);

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let result = runtime.block_on(compile(config, &entry));

    match result {
        Ok(compiled) => {
            if json {
                print_json(&TransformResultJson {
                    ok: true,
                    entry: entry.display().to_string(),
                    imports: compiled
                        .imports
                        .iter()
                        .map(|i| ImportJson {
                            specifier: i.specifier.clone(),
                            kind: format!("{:?}", i.kind),
                            rewritten: i.replacement.is_some(),
                        })
                        .collect(),
                    warnings: compiled.warnings,
                    code: Some(compiled.code),
                    error: None,
                });
            } else {
                for warning in &compiled.warnings {
                    eprintln!("warning: {warning}");
                }
                print!("{}", compiled.code);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                print_json(&TransformResultJson {
                    ok: false,
                    entry: entry.display().to_string(),
                    code: None,
                    imports: Vec::new(),
                    warnings: Vec::new(),
                    error: Some(ErrorJson::from(&e)),
                });
                std::process::exit(1);
            }
            Err(e).into_diagnostic()
        }
    }
}

async fn compile(config: &Config, entry: &Path) -> Result<CompiledModule, Error> {
    let loader = ModuleLoader::new(loader_config(config)?, NoHost);
    loader.lock_framework_dependencies(&resolve_project_root(config), config.debug);
    loader.compile(entry, config.debug).await
}
