//! `ondemand cache` command implementation.

use super::{loader_config, print_json};
use miette::{IntoDiagnostic, Result};
use ondemand_core::Config;
use serde::Serialize;

#[derive(Serialize)]
struct CacheClearJson {
    ok: bool,
    cache_dir: String,
    removed: bool,
}

/// Remove the project's cache directory (temporary modules, materialized
/// dependencies and captured diagnostics).
pub fn clear(config: &Config, json: bool) -> Result<()> {
    let cache_dir = loader_config(config).into_diagnostic()?.cache_dir();

    let removed = match std::fs::remove_dir_all(&cache_dir) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(e).into_diagnostic(),
    };

    if json {
        print_json(&CacheClearJson {
            ok: true,
            cache_dir: cache_dir.display().to_string(),
            removed,
        });
    } else if removed {
        println!("removed {}", cache_dir.display());
    } else {
        println!("nothing to remove at {}", cache_dir.display());
    }
    Ok(())
}
