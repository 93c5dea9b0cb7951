//! Node-style module resolution.
//!
//! Supports:
//! - Relative specifiers: `./`, `../`
//! - Absolute filesystem specifiers
//! - Bare specifiers with `node_modules` lookup
//! - Extension probing
//! - Directory resolution (`package.json` exports, `main`, `index.*`)
//! - `#`-prefixed specifiers through the nearest `package.json` imports field

use super::exports::{read_package_json, resolve_exports, resolve_exports_root, resolve_imports_map};
use std::path::{Path, PathBuf};

/// Default extensions for probing.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".json"];

/// Maximum number of tried paths to record.
const MAX_TRIED_PATHS: usize = 20;

/// Context for one resolution.
#[derive(Debug, Clone)]
pub struct ResolveContext<'a> {
    /// Directory containing the importing file.
    pub parent: PathBuf,
    /// Extensions to probe (in order).
    pub extensions: &'a [&'a str],
}

impl ResolveContext<'static> {
    /// Context with the default extension list.
    #[must_use]
    pub fn new(parent: impl Into<PathBuf>) -> Self {
        Self {
            parent: parent.into(),
            extensions: DEFAULT_EXTENSIONS,
        }
    }
}

impl<'a> ResolveContext<'a> {
    /// Override the probed extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: &'a [&'a str]) -> Self {
        self.extensions = extensions;
        self
    }
}

/// Reason codes for unresolved specifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveReasonCode {
    SpecifierInvalid,
    UnsupportedScheme,
    NotFound,
    IsDirectory,
    NodeModulesNotFound,
    /// An exports target is declared but the file does not exist.
    ExportsTargetNotFound,
    /// The package declares exports, none matching the subpath.
    ExportsNotFound,
    /// No `imports` entry matches a `#` specifier.
    ImportsNotFound,
}

impl std::fmt::Display for ResolveReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SpecifierInvalid => "SPECIFIER_INVALID",
            Self::UnsupportedScheme => "UNSUPPORTED_SCHEME",
            Self::NotFound => "NOT_FOUND",
            Self::IsDirectory => "IS_DIRECTORY",
            Self::NodeModulesNotFound => "NODE_MODULES_NOT_FOUND",
            Self::ExportsTargetNotFound => "EXPORTS_TARGET_NOT_FOUND",
            Self::ExportsNotFound => "EXPORTS_NOT_FOUND",
            Self::ImportsNotFound => "IMPORTS_NOT_FOUND",
        };
        write!(f, "{s}")
    }
}

/// Resolution result.
#[derive(Debug, Clone)]
pub struct ResolveResult {
    /// Resolved canonical path (if successful).
    pub resolved: Option<PathBuf>,
    /// Reason code if unresolved.
    pub reason: Option<ResolveReasonCode>,
    /// Candidate paths tried (capped).
    pub tried: Vec<PathBuf>,
}

impl ResolveResult {
    fn resolved(path: &Path, tried: &[PathBuf]) -> Self {
        Self {
            resolved: Some(dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())),
            reason: None,
            tried: tried.to_vec(),
        }
    }

    fn unresolved(reason: ResolveReasonCode, tried: &[PathBuf]) -> Self {
        Self {
            resolved: None,
            reason: Some(reason),
            tried: tried.to_vec(),
        }
    }

    /// Whether resolution succeeded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Resolve a specifier for an ESM import.
#[must_use]
pub fn resolve(ctx: &ResolveContext<'_>, spec: &str) -> ResolveResult {
    let mut tried = Vec::new();

    if spec.is_empty() {
        return ResolveResult::unresolved(ResolveReasonCode::SpecifierInvalid, &tried);
    }

    if spec.contains("://") || spec.starts_with("node:") || spec.starts_with("data:") {
        return ResolveResult::unresolved(ResolveReasonCode::UnsupportedScheme, &tried);
    }

    if spec.starts_with('#') {
        return resolve_hash_import(ctx, spec, &mut tried);
    }

    if spec.starts_with("./") || spec.starts_with("../") {
        return resolve_path(ctx, &ctx.parent.join(spec), &mut tried);
    }

    if is_absolute_path(spec) {
        return resolve_path(ctx, Path::new(spec), &mut tried);
    }

    resolve_bare(ctx, spec, &mut tried)
}

/// Check if a specifier is an absolute path.
fn is_absolute_path(spec: &str) -> bool {
    if spec.starts_with('/') || spec.starts_with("\\\\") {
        return true;
    }

    // Windows drive: C:\ or C:/
    let bytes = spec.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Resolve a `#`-prefixed import using the nearest package.json.
fn resolve_hash_import(
    ctx: &ResolveContext<'_>,
    spec: &str,
    tried: &mut Vec<PathBuf>,
) -> ResolveResult {
    let mut current = Some(ctx.parent.as_path());

    while let Some(dir) = current {
        let pkg_json_path = dir.join("package.json");

        if pkg_json_path.is_file() {
            add_tried(tried, &pkg_json_path);

            if let Some(target) =
                read_package_json(&pkg_json_path).and_then(|pkg| resolve_imports_map(&pkg, spec))
            {
                let target_path = dir.join(target.trim_start_matches("./"));
                return resolve_path(ctx, &target_path, tried);
            }

            return ResolveResult::unresolved(ResolveReasonCode::ImportsNotFound, tried);
        }

        current = dir.parent();
    }

    ResolveResult::unresolved(ResolveReasonCode::ImportsNotFound, tried)
}

/// Resolve a path with extension probing and directory resolution.
fn resolve_path(ctx: &ResolveContext<'_>, base: &Path, tried: &mut Vec<PathBuf>) -> ResolveResult {
    if base.is_file() {
        return ResolveResult::resolved(base, tried);
    }

    if let Some(found) = probe_extensions(ctx, base, tried) {
        return ResolveResult::resolved(&found, tried);
    }

    resolve_directory(ctx, base, tried)
}

/// Resolve a directory: package.json exports, then main, then `index.*`.
fn resolve_directory(
    ctx: &ResolveContext<'_>,
    dir: &Path,
    tried: &mut Vec<PathBuf>,
) -> ResolveResult {
    let pkg_json_path = dir.join("package.json");

    if pkg_json_path.is_file() {
        add_tried(tried, &pkg_json_path);

        if let Some(pkg_json) = read_package_json(&pkg_json_path) {
            if let Some(target) = resolve_exports_root(&pkg_json) {
                let target_path = dir.join(target.trim_start_matches("./"));
                return probe_target(ctx, &target_path, tried);
            }

            if let Some(main) = pkg_json.get("main").and_then(|v| v.as_str()) {
                let main_path = dir.join(main);
                if main_path.is_file() {
                    return ResolveResult::resolved(&main_path, tried);
                }
                if let Some(found) = probe_extensions(ctx, &main_path, tried)
                    .or_else(|| probe_index(ctx, &main_path, tried))
                {
                    return ResolveResult::resolved(&found, tried);
                }
            }
        }
    }

    if let Some(found) = probe_index(ctx, dir, tried) {
        return ResolveResult::resolved(&found, tried);
    }

    if dir.is_dir() {
        return ResolveResult::unresolved(ResolveReasonCode::IsDirectory, tried);
    }

    ResolveResult::unresolved(ResolveReasonCode::NotFound, tried)
}

/// Resolve a bare specifier via `node_modules`, walking up from the parent.
fn resolve_bare(ctx: &ResolveContext<'_>, spec: &str, tried: &mut Vec<PathBuf>) -> ResolveResult {
    let (pkg_name, subpath) = parse_bare_specifier(spec);

    let mut found_node_modules = false;
    let mut specific_error: Option<ResolveReasonCode> = None;
    let mut current = Some(ctx.parent.as_path());

    while let Some(dir) = current {
        let node_modules = dir.join("node_modules");

        if node_modules.is_dir() {
            found_node_modules = true;

            let pkg_dir = node_modules.join(pkg_name);
            add_tried(tried, &pkg_dir);

            if pkg_dir.is_dir() {
                let result = match subpath {
                    Some(sub) => resolve_package_subpath(ctx, &pkg_dir, sub, tried),
                    None => resolve_path(ctx, &pkg_dir, tried),
                };
                if result.is_resolved() {
                    return result;
                }
                if let Some(
                    reason @ (ResolveReasonCode::ExportsTargetNotFound
                    | ResolveReasonCode::ExportsNotFound),
                ) = result.reason
                {
                    specific_error = Some(reason);
                }
            }
        }

        current = dir.parent();
    }

    if let Some(error) = specific_error {
        return ResolveResult::unresolved(error, tried);
    }

    if found_node_modules {
        ResolveResult::unresolved(ResolveReasonCode::NotFound, tried)
    } else {
        ResolveResult::unresolved(ResolveReasonCode::NodeModulesNotFound, tried)
    }
}

/// Resolve a package subpath. Exports win when declared; otherwise the
/// subpath is resolved directly on the filesystem.
fn resolve_package_subpath(
    ctx: &ResolveContext<'_>,
    pkg_dir: &Path,
    subpath: &str,
    tried: &mut Vec<PathBuf>,
) -> ResolveResult {
    let pkg_json_path = pkg_dir.join("package.json");

    if pkg_json_path.is_file() {
        add_tried(tried, &pkg_json_path);

        if let Some(pkg_json) = read_package_json(&pkg_json_path) {
            if pkg_json.get("exports").is_some() {
                let exports_subpath = format!("./{subpath}");
                return match resolve_exports(&pkg_json, Some(&exports_subpath)) {
                    Some(target) => {
                        let target_path = pkg_dir.join(target.trim_start_matches("./"));
                        probe_target(ctx, &target_path, tried)
                    }
                    None => ResolveResult::unresolved(ResolveReasonCode::ExportsNotFound, tried),
                };
            }
        }
    }

    resolve_path(ctx, &pkg_dir.join(subpath), tried)
}

/// Probe an exports target: exact file, then with extensions.
fn probe_target(ctx: &ResolveContext<'_>, target: &Path, tried: &mut Vec<PathBuf>) -> ResolveResult {
    add_tried(tried, target);

    if target.is_file() {
        return ResolveResult::resolved(target, tried);
    }
    if let Some(found) = probe_extensions(ctx, target, tried) {
        return ResolveResult::resolved(&found, tried);
    }

    ResolveResult::unresolved(ResolveReasonCode::ExportsTargetNotFound, tried)
}

/// Try `base` with each extension appended.
fn probe_extensions(
    ctx: &ResolveContext<'_>,
    base: &Path,
    tried: &mut Vec<PathBuf>,
) -> Option<PathBuf> {
    ctx.extensions.iter().find_map(|ext| {
        let mut candidate = base.as_os_str().to_owned();
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        add_tried(tried, &candidate);
        candidate.is_file().then_some(candidate)
    })
}

/// Try `dir/index` with each extension.
fn probe_index(ctx: &ResolveContext<'_>, dir: &Path, tried: &mut Vec<PathBuf>) -> Option<PathBuf> {
    ctx.extensions.iter().find_map(|ext| {
        let index = dir.join(format!("index{ext}"));
        add_tried(tried, &index);
        index.is_file().then_some(index)
    })
}

/// Split a bare specifier into package name and optional subpath.
///
/// `lodash/fp` gives `("lodash", Some("fp"))`, `@scope/pkg/sub` gives
/// `("@scope/pkg", Some("sub"))`.
#[must_use]
pub fn parse_bare_specifier(spec: &str) -> (&str, Option<&str>) {
    let name_end = if spec.starts_with('@') {
        spec.match_indices('/').nth(1).map(|(i, _)| i)
    } else {
        spec.find('/')
    };

    match name_end {
        Some(i) => (&spec[..i], Some(&spec[i + 1..])),
        None => (spec, None),
    }
}

fn add_tried(tried: &mut Vec<PathBuf>, path: &Path) {
    if tried.len() < MAX_TRIED_PATHS {
        tried.push(path.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn canonical(path: &Path) -> PathBuf {
        dunce::canonicalize(path).unwrap()
    }

    #[test]
    fn test_parse_bare_specifier() {
        assert_eq!(parse_bare_specifier("react"), ("react", None));
        assert_eq!(
            parse_bare_specifier("react-dom/client"),
            ("react-dom", Some("client"))
        );
        assert_eq!(parse_bare_specifier("@scope/pkg"), ("@scope/pkg", None));
        assert_eq!(
            parse_bare_specifier("@scope/pkg/a/b"),
            ("@scope/pkg", Some("a/b"))
        );
    }

    #[test]
    fn test_relative_extension_probing() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("src/utils.ts"), "export {}");

        let ctx = ResolveContext::new(dir.path().join("src"));
        let result = resolve(&ctx, "./utils");
        assert_eq!(result.resolved, Some(canonical(&dir.path().join("src/utils.ts"))));
    }

    #[test]
    fn test_dotted_name_appends_extension() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("src/user.service.ts"), "export {}");

        let ctx = ResolveContext::new(dir.path().join("src"));
        let result = resolve(&ctx, "./user.service");
        assert_eq!(
            result.resolved,
            Some(canonical(&dir.path().join("src/user.service.ts")))
        );
    }

    #[test]
    fn test_bare_package_main() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("node_modules/left-pad");
        write(&pkg.join("package.json"), r#"{ "main": "lib/index.js" }"#);
        write(&pkg.join("lib/index.js"), "module.exports = 1");

        let ctx = ResolveContext::new(dir.path().join("src"));
        let result = resolve(&ctx, "left-pad");
        assert_eq!(result.resolved, Some(canonical(&pkg.join("lib/index.js"))));
    }

    #[test]
    fn test_bare_package_exports_import_condition() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("node_modules/ui-kit");
        write(
            &pkg.join("package.json"),
            r#"{ "exports": { ".": { "import": "./dist/index.mjs", "require": "./dist/index.cjs" },
                             "./button": "./dist/button.mjs" } }"#,
        );
        write(&pkg.join("dist/index.mjs"), "export {}");
        write(&pkg.join("dist/button.mjs"), "export {}");

        let ctx = ResolveContext::new(dir.path());
        assert_eq!(
            resolve(&ctx, "ui-kit").resolved,
            Some(canonical(&pkg.join("dist/index.mjs")))
        );
        assert_eq!(
            resolve(&ctx, "ui-kit/button").resolved,
            Some(canonical(&pkg.join("dist/button.mjs")))
        );

        let missing = resolve(&ctx, "ui-kit/internal");
        assert_eq!(missing.reason, Some(ResolveReasonCode::ExportsNotFound));
    }

    #[test]
    fn test_bare_walks_up_node_modules() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("node_modules/shared");
        write(&pkg.join("index.js"), "export {}");
        let nested = dir.path().join("apps/web/src");
        fs::create_dir_all(nested.join("node_modules")).unwrap();

        let ctx = ResolveContext::new(&nested);
        assert_eq!(
            resolve(&ctx, "shared").resolved,
            Some(canonical(&pkg.join("index.js")))
        );
    }

    #[test]
    fn test_hash_import() {
        let dir = tempdir().unwrap();
        write(
            &dir.path().join("package.json"),
            r##"{ "imports": { "#db": "./src/db.ts" } }"##,
        );
        write(&dir.path().join("src/db.ts"), "export {}");

        let ctx = ResolveContext::new(dir.path().join("src"));
        assert_eq!(
            resolve(&ctx, "#db").resolved,
            Some(canonical(&dir.path().join("src/db.ts")))
        );
        assert_eq!(
            resolve(&ctx, "#nope").reason,
            Some(ResolveReasonCode::ImportsNotFound)
        );
    }

    #[test]
    fn test_unresolved_reasons() {
        let dir = tempdir().unwrap();
        let ctx = ResolveContext::new(dir.path());

        assert_eq!(resolve(&ctx, "").reason, Some(ResolveReasonCode::SpecifierInvalid));
        assert_eq!(
            resolve(&ctx, "node:fs").reason,
            Some(ResolveReasonCode::UnsupportedScheme)
        );
        assert_eq!(
            resolve(&ctx, "missing").reason,
            Some(ResolveReasonCode::NodeModulesNotFound)
        );
    }
}
