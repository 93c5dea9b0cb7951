//! Package.json `exports` and `imports` field evaluation.
//!
//! Implements the subset of Node.js exports resolution the loader needs:
//! - Root exports (string, `"."` key, or root conditions)
//! - Subpath exports (`"./feature"`)
//! - Pattern exports with a single `*` wildcard
//! - Conditional exports, evaluated for ESM imports
//! - `#`-prefixed `imports` entries

use serde_json::Value;

/// Conditions honored for ESM imports, in priority order.
pub const IMPORT_CONDITIONS: &[&str] = &["import", "module", "node", "default"];

/// Maximum nesting depth of condition objects.
const MAX_CONDITION_DEPTH: usize = 4;

/// Resolve exports for the package root (`subpath == None`) or a subpath
/// in `"./feature"` form.
///
/// Returns the target path (starting with "./") if found.
#[must_use]
pub fn resolve_exports(pkg_json: &Value, subpath: Option<&str>) -> Option<String> {
    match subpath {
        None => resolve_exports_root(pkg_json),
        Some(sub) => resolve_exports_subpath(pkg_json, sub)
            .or_else(|| resolve_exports_pattern(pkg_json, sub)),
    }
}

/// Resolve the root export. Callers fall back to `main` when this is `None`.
#[must_use]
pub fn resolve_exports_root(pkg_json: &Value) -> Option<String> {
    let exports = pkg_json.get("exports")?;

    if let Some(s) = exports.as_str() {
        return validate_export_path(s);
    }

    let obj = exports.as_object()?;
    if let Some(dot) = obj.get(".") {
        return resolve_export_target(dot, 0);
    }

    // A root-level conditions object.
    if !obj.keys().any(|k| k.starts_with('.')) {
        return resolve_export_target(exports, 0);
    }

    None
}

/// Resolve an exact subpath key.
#[must_use]
pub fn resolve_exports_subpath(pkg_json: &Value, subpath: &str) -> Option<String> {
    if !subpath.starts_with("./") {
        return None;
    }

    let obj = pkg_json.get("exports")?.as_object()?;
    resolve_export_target(obj.get(subpath)?, 0)
}

/// Resolve a `*` pattern key. The longest matching key wins.
#[must_use]
pub fn resolve_exports_pattern(pkg_json: &Value, subpath: &str) -> Option<String> {
    if !subpath.starts_with("./") {
        return None;
    }

    let obj = pkg_json.get("exports")?.as_object()?;

    let (_, target, star) = obj
        .iter()
        .filter(|(key, _)| key.starts_with("./") && key.matches('*').count() == 1)
        .filter_map(|(key, value)| {
            match_pattern(key, subpath).map(|star| (key.as_str(), value, star))
        })
        .max_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| b.0.cmp(a.0)))?;

    let target = resolve_export_target(target, 0)?;
    substitute_star(&target, &star)
}

/// Resolve a `#`-prefixed specifier through the `imports` field.
#[must_use]
pub fn resolve_imports_map(pkg_json: &Value, spec: &str) -> Option<String> {
    if !spec.starts_with('#') {
        return None;
    }

    let imports = pkg_json.get("imports")?.as_object()?;
    resolve_export_target(imports.get(spec)?, 0)
}

/// Read and parse a package.json. `None` if missing or invalid.
#[must_use]
pub fn read_package_json(path: &std::path::Path) -> Option<Value> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Resolve a target that is a string, an array of fallbacks, or a conditions object.
fn resolve_export_target(target: &Value, depth: usize) -> Option<String> {
    if depth > MAX_CONDITION_DEPTH {
        return None;
    }

    match target {
        Value::String(s) => validate_export_path(s),
        Value::Array(items) => items
            .iter()
            .find_map(|item| resolve_export_target(item, depth + 1)),
        Value::Object(conditions) => IMPORT_CONDITIONS
            .iter()
            .filter_map(|c| conditions.get(*c))
            .find_map(|t| resolve_export_target(t, depth + 1)),
        _ => None,
    }
}

/// Match `"./features/*"` against `"./features/foo"`, returning `"foo"`.
fn match_pattern(pattern: &str, subpath: &str) -> Option<String> {
    let (prefix, suffix) = pattern.split_once('*')?;

    if !subpath.starts_with(prefix) || !subpath.ends_with(suffix) {
        return None;
    }
    if subpath.len() < prefix.len() + suffix.len() {
        return None;
    }

    let star = &subpath[prefix.len()..subpath.len() - suffix.len()];
    (!star.is_empty()).then(|| star.to_string())
}

/// Substitute `*` in the target, rejecting path traversal.
fn substitute_star(target: &str, star: &str) -> Option<String> {
    if target.matches('*').count() != 1 {
        return None;
    }

    let result = target.replace('*', star);
    if !result.starts_with("./") || result.split('/').any(|segment| segment == "..") {
        return None;
    }

    Some(result)
}

/// Export targets must be package-relative.
fn validate_export_path(path: &str) -> Option<String> {
    path.starts_with("./").then(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exports_string_root() {
        let pkg = json!({ "exports": "./dist/index.js" });
        assert_eq!(resolve_exports_root(&pkg), Some("./dist/index.js".to_string()));
    }

    #[test]
    fn test_exports_dot_conditions_prefer_import() {
        let pkg = json!({
            "exports": {
                ".": { "require": "./cjs.js", "import": "./esm.mjs", "default": "./d.js" }
            }
        });
        assert_eq!(resolve_exports_root(&pkg), Some("./esm.mjs".to_string()));
    }

    #[test]
    fn test_exports_root_conditions_nested() {
        let pkg = json!({
            "exports": {
                "node": { "import": "./node.mjs", "require": "./node.cjs" },
                "default": "./browser.js"
            }
        });
        assert_eq!(resolve_exports_root(&pkg), Some("./node.mjs".to_string()));
    }

    #[test]
    fn test_exports_array_fallback() {
        let pkg = json!({ "exports": { ".": ["invalid", "./ok.js"] } });
        assert_eq!(resolve_exports_root(&pkg), Some("./ok.js".to_string()));
    }

    #[test]
    fn test_exports_subpath() {
        let pkg = json!({
            "exports": {
                ".": "./index.js",
                "./client": { "import": "./client.mjs" }
            }
        });
        assert_eq!(
            resolve_exports(&pkg, Some("./client")),
            Some("./client.mjs".to_string())
        );
        assert_eq!(resolve_exports(&pkg, Some("./server")), None);
    }

    #[test]
    fn test_exports_pattern_most_specific_wins() {
        let pkg = json!({
            "exports": {
                "./*": "./dist/*.js",
                "./icons/*": "./dist/icons/*.mjs"
            }
        });
        assert_eq!(
            resolve_exports(&pkg, Some("./icons/close")),
            Some("./dist/icons/close.mjs".to_string())
        );
        assert_eq!(
            resolve_exports(&pkg, Some("./button")),
            Some("./dist/button.js".to_string())
        );
    }

    #[test]
    fn test_exports_pattern_rejects_traversal() {
        let pkg = json!({ "exports": { "./*": "./dist/*" } });
        assert_eq!(resolve_exports(&pkg, Some("./../secret")), None);
    }

    #[test]
    fn test_imports_map() {
        let pkg = json!({ "imports": { "#utils": { "default": "./src/utils.ts" } } });
        assert_eq!(
            resolve_imports_map(&pkg, "#utils"),
            Some("./src/utils.ts".to_string())
        );
        assert_eq!(resolve_imports_map(&pkg, "#missing"), None);
        assert_eq!(resolve_imports_map(&pkg, "utils"), None);
    }

    #[test]
    fn test_non_relative_export_rejected() {
        let pkg = json!({ "exports": "dist/index.js" });
        assert_eq!(resolve_exports_root(&pkg), None);
    }
}
