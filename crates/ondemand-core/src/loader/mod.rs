//! On-demand module loading.
//!
//! [`ModuleLoader::load`] takes a TypeScript/JSX file, transforms it, rewrites
//! its imports (materializing dependencies into the cache directory), writes
//! a temporary module and asks the [`ModuleHost`] to import it. Loaded modules
//! are cached in memory until the file's modification time changes.

pub mod dep_cache;
pub mod diagnostics;
pub mod dialect;
pub mod host;
pub mod lock;
pub mod module_cache;
pub mod rewrite;
pub mod shim;

pub use dep_cache::CachedDependencyFile;
pub use diagnostics::{DiagnosticCapture, DiagnosticRecord, JsonlCapture};
pub use dialect::Dialect;
pub use host::{ModuleHost, NodeHost, NodeModule};
pub use lock::{FrameworkLock, FrameworkLockRegistry};
pub use module_cache::{ModuleCache, ResolvedModule};
pub use rewrite::{
    ImportRewriter, Resolution, RewriteOutput, RewrittenImport, SpecifierKind,
};

use crate::compiler::{CompilerBackend, SourceMapKind, SwcBackend, TranspileSpec};
use crate::config::LoaderConfig;
use crate::error::Error;
use crate::paths::absolutize;
use crate::resolver::{ModuleResolver, NodeResolver};
use regex_lite::Regex;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info_span, Instrument};

/// Default delay before a loaded temporary module is removed. Zero removes it
/// as soon as the host import settles, before `load` returns.
pub const TEMP_FILE_TTL: Duration = Duration::ZERO;

/// Output of [`ModuleLoader::compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// Loadable ES module code.
    pub code: String,
    /// Every specifier seen while rewriting the entry file.
    pub imports: Vec<RewrittenImport>,
    /// Deprecation notices raised while rewriting.
    pub warnings: Vec<String>,
}

/// Loads TypeScript/JSX modules on demand through a host runtime.
pub struct ModuleLoader<H: ModuleHost> {
    config: LoaderConfig,
    host: H,
    resolver: Arc<dyn ModuleResolver>,
    backend: Arc<dyn CompilerBackend>,
    diagnostics: Option<Arc<dyn DiagnosticCapture>>,
    lock: FrameworkLockRegistry,
    modules: ModuleCache<H::Module>,
    temp_ttl: Duration,
}

impl<H: ModuleHost> ModuleLoader<H> {
    /// Loader with the Node resolver and the SWC backend.
    #[must_use]
    pub fn new(config: LoaderConfig, host: H) -> Self {
        Self {
            config,
            host,
            resolver: Arc::new(NodeResolver::new()),
            backend: Arc::new(SwcBackend::new()),
            diagnostics: None,
            lock: FrameworkLockRegistry::new(),
            modules: ModuleCache::new(),
            temp_ttl: TEMP_FILE_TTL,
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn CompilerBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Where debug-mode failures are recorded.
    #[must_use]
    pub fn with_diagnostics(mut self, capture: Arc<dyn DiagnosticCapture>) -> Self {
        self.diagnostics = Some(capture);
        self
    }

    /// How long a loaded temporary module is kept before removal.
    ///
    /// A non-zero delay runs on a spawned task, which is lost if the runtime
    /// shuts down first.
    #[must_use]
    pub fn with_temp_ttl(mut self, ttl: Duration) -> Self {
        self.temp_ttl = ttl;
        self
    }

    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Current framework lock.
    #[must_use]
    pub fn framework_lock(&self) -> FrameworkLock {
        self.lock.get()
    }

    /// Pin the UI runtime and renderer to the copies installed under
    /// `project_root`. Later shims seed the shared instance from them.
    pub fn lock_framework_dependencies(&self, project_root: &Path, debug: bool) -> FrameworkLock {
        self.lock.lock(
            project_root,
            self.resolver.as_ref(),
            &self.config.ui_runtime,
            &self.config.renderer,
            debug,
        )
    }

    /// Drop every cached module.
    pub fn clear_cache(&self) {
        self.modules.clear();
    }

    /// Load `path` through the host, reusing the cached module while the
    /// file's modification time is unchanged.
    pub async fn load(&self, path: &Path, debug: bool) -> Result<H::Module, Error> {
        let path = absolutize(path, &self.config.project_root);
        let span = info_span!("load", path = %path.display(), backend = self.backend.name());
        self.load_inner(path, debug).instrument(span).await
    }

    async fn load_inner(&self, path: PathBuf, debug: bool) -> Result<H::Module, Error> {
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            _ => return Err(Error::FileNotFound { path }),
        };
        let mtime = metadata.modified()?;

        if let Some(module) = self.modules.get(&path, mtime) {
            if debug {
                debug!("module cache hit");
            }
            return Ok(module);
        }

        let compiled = match self.compile(&path, debug).await {
            Ok(compiled) => compiled,
            Err(e) => {
                self.capture(debug, &path, &e);
                return Err(e);
            }
        };

        let temp = self.write_temp_module(&path, &compiled.code).await?;
        let url = url::Url::from_file_path(&temp)
            .map_err(|()| Error::other(format!("not an absolute path: {}", temp.display())))?;
        if debug {
            debug!(temp = %temp.display(), "importing compiled module");
        }

        match self.host.import(&url).await {
            Ok(module) => {
                self.modules.insert(path, mtime, module.clone());
                if !debug {
                    remove_temp(temp, self.temp_ttl).await;
                }
                Ok(module)
            }
            Err(e) => {
                if !debug {
                    let _ = tokio::fs::remove_file(&temp).await;
                }
                self.capture(debug, &path, &e);
                Err(e)
            }
        }
    }

    /// Transform `path` and rewrite its imports without loading it.
    ///
    /// The output depends only on the source, the configuration and the
    /// framework lock, so compiling an unchanged file twice yields the same code.
    pub async fn compile(&self, path: &Path, debug: bool) -> Result<CompiledModule, Error> {
        let path = absolutize(path, &self.config.project_root);
        let source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path })
            }
            Err(e) => return Err(e.into()),
        };

        let code = transform_source(self.backend.as_ref(), &self.config, &path, &source)?;

        let base_dir = path
            .parent()
            .map_or_else(|| self.config.project_root.clone(), Path::to_path_buf);
        let rewriter = ImportRewriter::new(
            &self.config,
            self.resolver.as_ref(),
            self.backend.as_ref(),
            self.lock.get(),
        )
        .with_diagnostics(self.diagnostics.as_deref());
        let rewritten = rewriter
            .rewrite(&code, &base_dir, &self.config.cache_dir(), debug)
            .await?;

        Ok(CompiledModule {
            code: strip_stylesheet_imports(&rewritten.code),
            imports: rewritten.imports,
            warnings: rewritten.warnings,
            path,
        })
    }

    /// Write `code` to a uniquely named temporary module next to the cache.
    async fn write_temp_module(&self, path: &Path, code: &str) -> Result<PathBuf, Error> {
        let cache_dir = self.config.cache_dir();
        tokio::fs::create_dir_all(&cache_dir).await?;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("module");
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        let temp = cache_dir.join(format!(
            "{stem}.{millis}-{}.mjs",
            ondemand_util::fs::next_sequence()
        ));

        tokio::fs::write(&temp, code).await?;
        Ok(temp)
    }

    fn capture(&self, debug: bool, path: &Path, error: &Error) {
        if !debug {
            return;
        }
        if let Some(capture) = &self.diagnostics {
            capture.capture(&DiagnosticRecord::new(
                error.code(),
                path,
                error.to_string(),
            ));
        }
    }
}

/// Remove a loaded temporary module once the host is done reading it.
async fn remove_temp(temp: PathBuf, ttl: Duration) {
    async fn remove(temp: &Path) {
        if let Err(e) = tokio::fs::remove_file(temp).await {
            debug!(path = %temp.display(), error = %e, "temporary module already gone");
        }
    }

    if ttl.is_zero() {
        remove(&temp).await;
        return;
    }
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        remove(&temp).await;
    });
}

/// Transform one source file into ES module code, adding the factory import
/// when markup lowering references it.
pub(crate) fn transform_source(
    backend: &dyn CompilerBackend,
    config: &LoaderConfig,
    path: &Path,
    source: &str,
) -> Result<String, Error> {
    let dialect = Dialect::for_path(path);
    let spec = TranspileSpec::new(path, dialect)
        .with_jsx(config.jsx_factory.as_str(), config.jsx_fragment.as_str())
        .with_target(config.target)
        .with_sourcemaps(SourceMapKind::Inline);

    let output = backend
        .transpile(&spec, source)
        .map_err(|source| Error::Transform {
            file: path.to_path_buf(),
            source,
        })?;

    if dialect == Dialect::Json {
        return Ok(output.code);
    }
    Ok(ensure_runtime_import(&output.code, config).into_owned())
}

/// Prepend `import <Root> from '<ui_runtime>';` when code calls the factory
/// through a namespace (`React.createElement`) that nothing imports.
#[must_use]
pub fn ensure_runtime_import<'c>(code: &'c str, config: &LoaderConfig) -> Cow<'c, str> {
    if !config.jsx_factory.contains('.') {
        return Cow::Borrowed(code);
    }

    let root = regex_lite::escape(config.factory_root());
    let referenced = Regex::new(&format!(r"\b{root}\s*\."))
        .map(|re| re.is_match(code))
        .unwrap_or(false);
    if !referenced {
        return Cow::Borrowed(code);
    }

    let imported = Regex::new(&format!(
        r"\bimport\s+(?:\*\s*as\s+)?{root}\b|\bimport\s*\{{[^}}]*\b{root}\b[^}}]*\}}|\b(?:const|let|var)\s+{root}\b"
    ))
    .map(|re| re.is_match(code))
    .unwrap_or(true);
    if imported {
        return Cow::Borrowed(code);
    }

    Cow::Owned(format!(
        "import {} from '{}';\n{code}",
        config.factory_root(),
        config.ui_runtime
    ))
}

fn stylesheet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^[ \t]*import\s+(?:[^'";\n]+\s+from\s+)?['"][^'"\n]+\.(?:css|scss|sass|less)(?:\?[^'"\n]*)?['"][ \t]*;?[ \t]*\n?"#,
        )
        .unwrap()
    })
}

/// Remove stylesheet imports (`.css`, `.scss`, `.sass`, `.less`), which the
/// host cannot evaluate.
#[must_use]
pub fn strip_stylesheet_imports(code: &str) -> String {
    stylesheet_regex().replace_all(code, "").into_owned()
}

/// `file:` URL for an absolute path.
#[must_use]
pub fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path)
        .map_or_else(|()| path.display().to_string(), |u| u.to_string())
}
