//! Import specifier rewriting.
//!
//! Every quoted specifier in `from '…'`, side-effect `import '…'` and literal
//! `import('…')` positions is replaced by something the host can load:
//! a shim `data:` URL for the UI runtime and renderer, or a `file:` URL for
//! resolved files. Typed and markup dependencies are transformed into the
//! on-disk dependency cache first, recursively.
//!
//! The scan is textual. Specifier-shaped text inside string literals or
//! comments (`"import 'x'"`) is rewritten as well.

use super::dep_cache::CachedDependencyFile;
use super::diagnostics::{DiagnosticCapture, DiagnosticRecord};
use super::dialect::Dialect;
use super::lock::FrameworkLock;
use super::shim::{ShimBuilder, ShimKind};
use super::{file_url, strip_stylesheet_imports, transform_source};
use crate::compiler::CompilerBackend;
use crate::config::LoaderConfig;
use crate::error::Error;
use crate::paths::find_package_dir;
use crate::resolver::ModuleResolver;
use futures::future::{BoxFuture, FutureExt};
use regex_lite::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Suffixes tried after the literal path, in order.
pub const PROBE_SUFFIXES: &[&str] = &[".tsx", ".ts", ".jsx", ".js", ".mjs", ""];

/// Framework entry files, preferring built output over raw source.
pub const FRAMEWORK_ENTRIES: &[&str] = &[
    "dist/index.mjs",
    "dist/index.js",
    "src/index.ts",
    "src/index.tsx",
];

/// Extensions read as source. Anything else is handed to the host untouched.
const SOURCE_EXTENSIONS: &[&str] = &["ts", "mts", "cts", "tsx", "jsx", "js", "mjs", "json"];

const STYLESHEET_EXTENSIONS: &[&str] = &[".css", ".scss", ".sass", ".less"];

fn specifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:\bfrom\s*|\bimport\s*\(?\s*)(?:'([^'\n]*)'|"([^"\n]*)")"#).unwrap()
    })
}

/// Classification of a specifier. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    /// The UI runtime or one of its sub-paths.
    RuntimeShim,
    /// The DOM renderer or one of its sub-paths.
    RendererShim,
    /// The native platform package, served by its web polyfill.
    NativePlatform,
    /// The framework importing itself, possibly under a deprecated name.
    FrameworkSelf { legacy: bool },
    /// `./`, `../`, or the project root alias.
    Relative,
    /// Anything else.
    Bare,
}

impl SpecifierKind {
    /// Classify `spec` under `config`.
    #[must_use]
    pub fn classify(spec: &str, config: &LoaderConfig) -> Self {
        if package_subpath(spec, &config.ui_runtime).is_some() {
            Self::RuntimeShim
        } else if package_subpath(spec, &config.renderer).is_some() {
            Self::RendererShim
        } else if package_subpath(spec, &config.native_platform).is_some() {
            Self::NativePlatform
        } else if package_subpath(spec, &config.framework_name).is_some() {
            Self::FrameworkSelf { legacy: false }
        } else if config
            .legacy_framework_names
            .iter()
            .any(|name| package_subpath(spec, name).is_some())
        {
            Self::FrameworkSelf { legacy: true }
        } else if spec.starts_with("./")
            || spec.starts_with("../")
            || spec.starts_with(config.root_alias.as_str())
        {
            Self::Relative
        } else {
            Self::Bare
        }
    }
}

/// `Some("")` for `spec == name`, `Some("sub/path")` for `name/sub/path`.
fn package_subpath<'s>(spec: &'s str, name: &str) -> Option<&'s str> {
    let rest = spec.strip_prefix(name)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('/')
    }
}

/// Where a specifier resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A synthetic module, as a `data:` URL.
    Shim(String),
    /// A file the host loads as-is.
    Path(PathBuf),
    /// A file that must be transformed into the dependency cache first.
    Source(PathBuf),
    /// Nothing matched. The specifier is left unmodified for the host.
    Unresolved { reason: &'static str },
}

/// One rewritten (or deliberately untouched) specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenImport {
    pub specifier: String,
    pub kind: SpecifierKind,
    /// New specifier text, `None` when left as-is.
    pub replacement: Option<String>,
}

/// Result of rewriting one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutput {
    pub code: String,
    pub imports: Vec<RewrittenImport>,
    /// Deprecation notices, including those from materialized dependencies.
    pub warnings: Vec<String>,
}

/// Inputs to one resolution strategy.
struct ResolveRequest<'r> {
    spec: &'r str,
    kind: SpecifierKind,
    base_dir: &'r Path,
}

type Strategy<'a> = fn(&ImportRewriter<'a>, &ResolveRequest<'_>) -> Option<Resolution>;

/// Rewrites the imports of a module and materializes its dependencies.
pub struct ImportRewriter<'a> {
    config: &'a LoaderConfig,
    resolver: &'a dyn ModuleResolver,
    backend: &'a dyn CompilerBackend,
    diagnostics: Option<&'a dyn DiagnosticCapture>,
    lock: FrameworkLock,
}

impl<'a> ImportRewriter<'a> {
    #[must_use]
    pub fn new(
        config: &'a LoaderConfig,
        resolver: &'a dyn ModuleResolver,
        backend: &'a dyn CompilerBackend,
        lock: FrameworkLock,
    ) -> Self {
        Self {
            config,
            resolver,
            backend,
            diagnostics: None,
            lock,
        }
    }

    /// Capture dependency failures here when running in debug mode.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Option<&'a dyn DiagnosticCapture>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Rewrite every import in `code`. Relative specifiers resolve against
    /// `base_dir`; materialized dependencies land in `cache_dir`.
    pub async fn rewrite(
        &self,
        code: &str,
        base_dir: &Path,
        cache_dir: &Path,
        debug: bool,
    ) -> Result<RewriteOutput, Error> {
        let mut visiting = HashSet::new();
        self.rewrite_with(code, base_dir, cache_dir, debug, &mut visiting)
            .await
    }

    fn rewrite_with<'b>(
        &'b self,
        code: &'b str,
        base_dir: &'b Path,
        cache_dir: &'b Path,
        debug: bool,
        visiting: &'b mut HashSet<PathBuf>,
    ) -> BoxFuture<'b, Result<RewriteOutput, Error>> {
        async move {
            let found: Vec<(std::ops::Range<usize>, String)> = specifier_regex()
                .captures_iter(code)
                .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
                .map(|m| (m.range(), m.as_str().to_string()))
                .collect();

            let mut output = RewriteOutput {
                code: code.to_string(),
                ..Default::default()
            };
            let mut delta: isize = 0;

            for (range, spec) in found {
                if is_stylesheet(&spec) {
                    continue;
                }

                let kind = SpecifierKind::classify(&spec, self.config);
                if matches!(kind, SpecifierKind::FrameworkSelf { legacy: true }) {
                    let notice = format!(
                        "'{spec}' is deprecated, import '{}' instead",
                        self.config.framework_name
                    );
                    warn!(specifier = %spec, framework = %self.config.framework_name, "deprecated framework import");
                    output.warnings.push(notice);
                }

                let request = ResolveRequest {
                    spec: &spec,
                    kind,
                    base_dir,
                };
                let resolution = self.resolve_specifier(&request);
                if debug {
                    debug!(specifier = %spec, ?kind, ?resolution, base = %base_dir.display(), "resolved import");
                }

                let replacement = match resolution {
                    Resolution::Shim(url) => Some(url),
                    Resolution::Path(path) => Some(file_url(&path)),
                    Resolution::Source(path) => {
                        let (url, warnings) =
                            self.materialize(path, cache_dir, debug, visiting).await?;
                        output.warnings.extend(warnings);
                        Some(url)
                    }
                    Resolution::Unresolved { .. } => None,
                };

                if let Some(new) = &replacement {
                    let start = offset(range.start, delta);
                    let end = offset(range.end, delta);
                    output.code.replace_range(start..end, new);
                    delta += isize::try_from(new.len()).unwrap_or(isize::MAX)
                        - isize::try_from(range.len()).unwrap_or(isize::MAX);
                }

                output.imports.push(RewrittenImport {
                    specifier: spec,
                    kind,
                    replacement,
                });
            }

            Ok(output)
        }
        .boxed()
    }

    /// Run the strategies in rank order. The first answer wins.
    fn resolve_specifier(&self, request: &ResolveRequest<'_>) -> Resolution {
        let strategies: [Strategy<'a>; 6] = [
            Self::runtime_shim,
            Self::renderer_shim,
            Self::native_platform,
            Self::framework_self,
            Self::relative,
            Self::bare,
        ];

        strategies
            .iter()
            .find_map(|strategy| strategy(self, request))
            .unwrap_or(Resolution::Unresolved {
                reason: "no strategy matched",
            })
    }

    fn shims(&self) -> ShimBuilder<'_> {
        ShimBuilder {
            runtime_slot: &self.config.runtime_slot,
            renderer_slot: &self.config.renderer_slot,
            lock: &self.lock,
        }
    }

    fn runtime_shim(&self, request: &ResolveRequest<'_>) -> Option<Resolution> {
        if request.kind != SpecifierKind::RuntimeShim {
            return None;
        }
        let subpath = package_subpath(request.spec, &self.config.ui_runtime).filter(|s| !s.is_empty());
        Some(Resolution::Shim(
            self.shims().data_url(ShimKind::Runtime, subpath),
        ))
    }

    fn renderer_shim(&self, request: &ResolveRequest<'_>) -> Option<Resolution> {
        if request.kind != SpecifierKind::RendererShim {
            return None;
        }
        let subpath = package_subpath(request.spec, &self.config.renderer).filter(|s| !s.is_empty());
        Some(Resolution::Shim(
            self.shims().data_url(ShimKind::Renderer, subpath),
        ))
    }

    fn native_platform(&self, request: &ResolveRequest<'_>) -> Option<Resolution> {
        if request.kind != SpecifierKind::NativePlatform {
            return None;
        }
        let subpath = package_subpath(request.spec, &self.config.native_platform).unwrap_or("");
        let polyfill = if subpath.is_empty() {
            self.config.native_polyfill.clone()
        } else {
            format!("{}/{subpath}", self.config.native_polyfill)
        };

        Some(
            self.resolver
                .resolve(&polyfill, request.base_dir)
                .map_or(
                    Resolution::Unresolved {
                        reason: "native platform polyfill not installed",
                    },
                    classify_path,
                ),
        )
    }

    fn framework_self(&self, request: &ResolveRequest<'_>) -> Option<Resolution> {
        let SpecifierKind::FrameworkSelf { .. } = request.kind else {
            return None;
        };

        let (name, subpath) = std::iter::once(self.config.framework_name.as_str())
            .chain(self.config.legacy_framework_names.iter().map(String::as_str))
            .find_map(|name| package_subpath(request.spec, name).map(|sub| (name, sub)))?;

        if !subpath.is_empty() {
            let current = format!("{}/{subpath}", self.config.framework_name);
            return self
                .resolver
                .resolve(&current, request.base_dir)
                .map(classify_path);
        }

        let root = self
            .config
            .framework_root
            .clone()
            .or_else(|| find_package_dir(request.base_dir, &self.config.framework_name))
            .or_else(|| find_package_dir(request.base_dir, name))
            .or_else(|| find_package_dir(&self.config.project_root, &self.config.framework_name))?;

        FRAMEWORK_ENTRIES
            .iter()
            .map(|entry| root.join(entry))
            .find(|candidate| candidate.is_file())
            .map(|entry| classify_path(canonical(&entry)))
    }

    fn relative(&self, request: &ResolveRequest<'_>) -> Option<Resolution> {
        if request.kind != SpecifierKind::Relative {
            return None;
        }

        let base = match request.spec.strip_prefix(self.config.root_alias.as_str()) {
            Some(rest) if !request.spec.starts_with('.') => self.config.project_root.join(rest),
            _ => request.base_dir.join(request.spec),
        };

        probe_relative(&base).map(classify_path)
    }

    fn bare(&self, request: &ResolveRequest<'_>) -> Option<Resolution> {
        Some(
            self.resolver
                .resolve(request.spec, request.base_dir)
                .map_or(
                    Resolution::Unresolved {
                        reason: "not found in module resolution scope",
                    },
                    classify_path,
                ),
        )
    }

    /// Transform `path` into the dependency cache unless a fresh copy exists.
    /// Returns the cached module URL and any warnings raised below it.
    fn materialize<'b>(
        &'b self,
        path: PathBuf,
        cache_dir: &'b Path,
        debug: bool,
        visiting: &'b mut HashSet<PathBuf>,
    ) -> BoxFuture<'b, Result<(String, Vec<String>), Error>> {
        async move {
            let entry = CachedDependencyFile::new(&path, cache_dir);

            // Already being materialized further up: the file will exist
            // before the host evaluates anything.
            if visiting.contains(&path) {
                if debug {
                    debug!(path = %path.display(), "import cycle, reusing cache path");
                }
                return Ok((entry.url(), Vec::new()));
            }

            if entry.is_fresh().await {
                if debug {
                    debug!(path = %path.display(), cached = %entry.cached_path.display(), "dependency cache hit");
                }
                return Ok((entry.url(), Vec::new()));
            }

            visiting.insert(path.clone());
            let result = self.build_dependency(&entry, cache_dir, debug, visiting).await;
            visiting.remove(&path);

            match result {
                Ok(warnings) => {
                    if debug {
                        debug!(path = %path.display(), cached = %entry.cached_path.display(), "materialized dependency");
                    }
                    Ok((entry.url(), warnings))
                }
                Err(source) => {
                    let err = Error::DependencyTransform {
                        path: path.clone(),
                        source: Box::new(source),
                    };
                    if let (true, Some(capture)) = (debug, self.diagnostics) {
                        capture.capture(&DiagnosticRecord::new(err.code(), &path, err.to_string()));
                    }
                    Err(err)
                }
            }
        }
        .boxed()
    }

    async fn build_dependency(
        &self,
        entry: &CachedDependencyFile,
        cache_dir: &Path,
        debug: bool,
        visiting: &mut HashSet<PathBuf>,
    ) -> Result<Vec<String>, Error> {
        let source = tokio::fs::read_to_string(&entry.source_path).await?;
        let code = transform_source(self.backend, self.config, &entry.source_path, &source)?;

        let base_dir = entry
            .source_path
            .parent()
            .map_or_else(|| self.config.project_root.clone(), Path::to_path_buf);
        let rewritten = self
            .rewrite_with(&code, &base_dir, cache_dir, debug, visiting)
            .await?;

        entry
            .write(strip_stylesheet_imports(&rewritten.code))
            .await?;
        Ok(rewritten.warnings)
    }
}

/// Probe `base` as written, then with each suffix, then as a directory index.
#[must_use]
pub fn probe_relative(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(canonical(base));
    }

    let with_suffix = |path: &Path, suffix: &str| {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(suffix);
        PathBuf::from(candidate)
    };

    let index = base.join("index");
    PROBE_SUFFIXES
        .iter()
        .map(|suffix| with_suffix(base, suffix))
        .chain(PROBE_SUFFIXES.iter().map(|suffix| with_suffix(&index, suffix)))
        .find(|candidate| candidate.is_file())
        .map(|found| canonical(&found))
}

/// Files with typed, markup or data extensions are materialized.
/// Typed, markup and JSON files are materialized; plain JavaScript is not.
fn classify_path(path: PathBuf) -> Resolution {
    let dialect = path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|ext| SOURCE_EXTENSIONS.contains(ext))
        .map(Dialect::from_extension);
    match dialect {
        Some(d) if d.needs_transform() || d == Dialect::Json => Resolution::Source(path),
        _ => Resolution::Path(path),
    }
}

fn is_stylesheet(spec: &str) -> bool {
    let path = spec.split(['?', '#']).next().unwrap_or(spec);
    STYLESHEET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn canonical(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn offset(position: usize, delta: isize) -> usize {
    position.saturating_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::SwcBackend;
    use crate::resolver::NodeResolver;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_classify() {
        let config = LoaderConfig::new("/p");
        let classify = |s| SpecifierKind::classify(s, &config);

        assert_eq!(classify("react"), SpecifierKind::RuntimeShim);
        assert_eq!(classify("react/jsx-runtime"), SpecifierKind::RuntimeShim);
        assert_eq!(classify("react-dom/client"), SpecifierKind::RendererShim);
        assert_eq!(classify("react-native"), SpecifierKind::NativePlatform);
        assert_eq!(
            classify("ondemand"),
            SpecifierKind::FrameworkSelf { legacy: false }
        );
        assert_eq!(
            classify("ondemand-react"),
            SpecifierKind::FrameworkSelf { legacy: true }
        );
        assert_eq!(classify("./Button"), SpecifierKind::Relative);
        assert_eq!(classify("../lib/util"), SpecifierKind::Relative);
        assert_eq!(classify("@/components/Button"), SpecifierKind::Relative);
        assert_eq!(classify("react-query"), SpecifierKind::Bare);
        assert_eq!(classify("@scope/pkg"), SpecifierKind::Bare);
    }

    #[test]
    fn test_probe_order() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("Button.ts"), "");
        write(&dir.path().join("Button.tsx"), "");
        write(&dir.path().join("Card/index.jsx"), "");
        write(&dir.path().join("Card.mjs"), "");
        write(&dir.path().join("styles.css"), "");

        let probe = |rel: &str| probe_relative(&dir.path().join(rel));
        let canon = |rel: &str| dunce::canonicalize(dir.path().join(rel)).unwrap();

        assert_eq!(probe("Button"), Some(canon("Button.tsx")));
        assert_eq!(probe("Button.ts"), Some(canon("Button.ts")));
        // A suffixed sibling beats a directory index.
        assert_eq!(probe("Card"), Some(canon("Card.mjs")));
        assert_eq!(probe("Card/index"), Some(canon("Card/index.jsx")));
        assert_eq!(probe("Missing"), None);
    }

    #[test]
    fn test_classify_path_by_dialect() {
        for name in ["a.ts", "a.mts", "a.tsx", "a.jsx", "a.json"] {
            let path = PathBuf::from("/p").join(name);
            assert_eq!(classify_path(path.clone()), Resolution::Source(path));
        }
        for name in ["a.js", "a.mjs", "a.cjs", "a.wasm", "LICENSE"] {
            let path = PathBuf::from("/p").join(name);
            assert_eq!(classify_path(path.clone()), Resolution::Path(path));
        }
    }

    #[test]
    fn test_is_stylesheet() {
        assert!(is_stylesheet("./app.css"));
        assert!(is_stylesheet("./theme.scss?inline"));
        assert!(!is_stylesheet("./css-utils"));
    }

    #[tokio::test]
    async fn test_rewrite_shims_and_leaves_unresolved() {
        let dir = tempdir().unwrap();
        let config = LoaderConfig::new(dir.path());
        let resolver = NodeResolver::new();
        let backend = SwcBackend::new();
        let rewriter =
            ImportRewriter::new(&config, &resolver, &backend, FrameworkLock::default());

        let code = "import React from 'react';\nimport { createRoot } from \"react-dom/client\";\nimport x from 'not-installed';\n";
        let output = rewriter
            .rewrite(code, dir.path(), &config.cache_dir(), false)
            .await
            .unwrap();

        assert_eq!(output.imports.len(), 3);
        assert!(output.imports[0]
            .replacement
            .as_deref()
            .unwrap()
            .starts_with("data:text/javascript;base64,"));
        assert_eq!(output.imports[1].kind, SpecifierKind::RendererShim);
        assert_eq!(output.imports[2].replacement, None);
        assert!(output.code.contains("from 'not-installed'"));
        assert!(!output.code.contains("from 'react'"));
    }

    #[tokio::test]
    async fn test_rewrite_relative_js_uses_file_url() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("src/util.js"), "export const a = 1;");
        let config = LoaderConfig::new(dir.path());
        let resolver = NodeResolver::new();
        let backend = SwcBackend::new();
        let rewriter =
            ImportRewriter::new(&config, &resolver, &backend, FrameworkLock::default());

        let code = "import { a } from './util';\nconst lazy = () => import('./util.js');\n";
        let output = rewriter
            .rewrite(code, &dir.path().join("src"), &config.cache_dir(), false)
            .await
            .unwrap();

        let expected = file_url(&dunce::canonicalize(dir.path().join("src/util.js")).unwrap());
        assert_eq!(output.code.matches(&expected).count(), 2);
        assert!(output.code.contains(&format!("import('{expected}')")));
    }

    #[tokio::test]
    async fn test_legacy_framework_name_warns() {
        let dir = tempdir().unwrap();
        write(
            &dir.path().join("node_modules/ondemand/dist/index.mjs"),
            "export const x = 1;",
        );
        let config = LoaderConfig::new(dir.path());
        let resolver = NodeResolver::new();
        let backend = SwcBackend::new();
        let rewriter =
            ImportRewriter::new(&config, &resolver, &backend, FrameworkLock::default());

        let output = rewriter
            .rewrite(
                "import { x } from 'ondemand-react';",
                dir.path(),
                &config.cache_dir(),
                true,
            )
            .await
            .unwrap();

        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].contains("ondemand-react"));
        assert!(output.code.contains("dist/index.mjs"));
    }
}
