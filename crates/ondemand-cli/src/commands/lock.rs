//! `ondemand lock` command implementation.

use super::{loader_config, print_json, resolve_project_root, ErrorJson};
use miette::{IntoDiagnostic, Result};
use ondemand_core::loader::FrameworkLockRegistry;
use ondemand_core::{Config, FrameworkLock, NodeResolver};
use serde::Serialize;

#[derive(Serialize)]
struct LockResultJson {
    ok: bool,
    project_root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lock: Option<FrameworkLock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
}

pub fn run(config: &Config, json: bool) -> Result<()> {
    let root = resolve_project_root(config);

    let loader_config = match loader_config(config) {
        Ok(c) => c,
        Err(e) if json => {
            print_json(&LockResultJson {
                ok: false,
                project_root: root.display().to_string(),
                lock: None,
                error: Some(ErrorJson::from(&e)),
            });
            std::process::exit(1);
        }
        Err(e) => return Err(e).into_diagnostic(),
    };

    let registry = FrameworkLockRegistry::new();
    let lock = registry.lock(
        &root,
        &NodeResolver::new(),
        &loader_config.ui_runtime,
        &loader_config.renderer,
        config.debug,
    );

    if json {
        print_json(&LockResultJson {
            ok: true,
            project_root: root.display().to_string(),
            lock: Some(lock),
            error: None,
        });
        return Ok(());
    }

    let show = |name: &str, path: Option<&std::path::PathBuf>| match path {
        Some(p) => println!("{name}: {}", p.display()),
        None => println!("{name}: (not installed)"),
    };
    show(&loader_config.ui_runtime, lock.ui_runtime_path.as_ref());
    show(&loader_config.renderer, lock.renderer_path.as_ref());
    Ok(())
}
