//! Host runtimes that evaluate generated modules.

use crate::error::Error;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

/// Evaluates an ES module by URL and hands back a handle to it.
pub trait ModuleHost: Send + Sync {
    /// Handle to an evaluated module. Cloned out of the module cache on hits.
    type Module: Clone + Send + Sync + 'static;

    /// Import the module at `url`. Failures map to [`Error::Import`].
    fn import(&self, url: &Url) -> impl Future<Output = Result<Self::Module, Error>> + Send;
}

/// Exports of a module evaluated by [`NodeHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeModule {
    pub url: Url,
    /// Export names, sorted.
    pub exports: Vec<String>,
}

/// Imports the module in a `node` subprocess and reports its export names.
const IMPORT_SCRIPT: &str = r#"
const url = process.argv[process.argv.length - 1];
try {
  const mod = await import(url);
  process.stdout.write(JSON.stringify(Object.keys(mod).sort()));
} catch (e) {
  process.stderr.write(String((e && e.stack) || e));
  process.exit(1);
}
"#;

/// Host backed by a local Node.js installation.
#[derive(Debug, Clone)]
pub struct NodeHost {
    node: PathBuf,
}

impl NodeHost {
    /// Locate `node` on `PATH`.
    pub fn discover() -> Result<Self, Error> {
        let node = which::which("node")
            .map_err(|e| Error::other(format!("node executable not found: {e}")))?;
        Ok(Self { node })
    }

    /// Use a specific `node` binary.
    #[must_use]
    pub fn with_binary(node: impl Into<PathBuf>) -> Self {
        Self { node: node.into() }
    }
}

impl ModuleHost for NodeHost {
    type Module = NodeModule;

    fn import(&self, url: &Url) -> impl Future<Output = Result<NodeModule, Error>> + Send {
        let node = self.node.clone();
        let url = url.clone();
        async move {
            let output = Command::new(&node)
                .arg("--input-type=module")
                .arg("-e")
                .arg(IMPORT_SCRIPT)
                .arg(url.as_str())
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| Error::Import {
                    url: url.to_string(),
                    message: format!("failed to spawn {}: {e}", node.display()),
                })?;

            if !output.status.success() {
                return Err(Error::Import {
                    url: url.to_string(),
                    message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            let exports: Vec<String> =
                serde_json::from_slice(&output.stdout).map_err(|e| Error::Import {
                    url: url.to_string(),
                    message: format!("unexpected host output: {e}"),
                })?;

            Ok(NodeModule { url, exports })
        }
    }
}
