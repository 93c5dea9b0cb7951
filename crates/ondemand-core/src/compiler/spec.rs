//! Transpilation request and output types.
//!
//! These types capture all options for a deterministic transform.
//! Identical specs and sources always produce identical output.

use crate::loader::Dialect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default JSX factory.
pub const DEFAULT_JSX_FACTORY: &str = "React.createElement";

/// Default JSX fragment symbol.
pub const DEFAULT_JSX_FRAGMENT: &str = "React.Fragment";

/// How the source map travels with the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapKind {
    #[default]
    None,
    /// Trailing `//# sourceMappingURL=data:...` comment.
    Inline,
}

/// ECMAScript version the emitted code may use. Set from `target` in
/// `ondemand.json` (`"es2015"` .. `"esnext"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EsTarget {
    ES2015,
    ES2016,
    ES2017,
    ES2018,
    ES2019,
    ES2020,
    ES2021,
    #[default]
    ES2022,
    ESNext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Warning,
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// One parser or transform message, with its position when known.
/// `line` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl Diagnostic {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            message: message.into(),
            file: None,
            line: None,
            column: None,
        }
    }

    /// Attach `file:line:column`.
    #[must_use]
    pub fn with_location(mut self, file: PathBuf, line: u32, column: u32) -> Self {
        (self.file, self.line, self.column) = (Some(file), Some(line), Some(column));
        self
    }
}

/// What to transpile and how, for a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranspileSpec {
    /// Source file path. Used for diagnostics and source map names only.
    pub input_path: PathBuf,
    /// Syntax dialect of the source.
    pub dialect: Dialect,
    /// Call emitted for JSX elements.
    pub jsx_factory: String,
    /// Symbol emitted for JSX fragments.
    pub jsx_fragment: String,
    #[serde(default)]
    pub sourcemaps: SourceMapKind,
    #[serde(default)]
    pub target: EsTarget,
}

impl TranspileSpec {
    /// Create a new spec for `input_path` with the given dialect and default options.
    #[must_use]
    pub fn new(input_path: impl Into<PathBuf>, dialect: Dialect) -> Self {
        Self {
            input_path: input_path.into(),
            dialect,
            jsx_factory: DEFAULT_JSX_FACTORY.to_string(),
            jsx_fragment: DEFAULT_JSX_FRAGMENT.to_string(),
            sourcemaps: SourceMapKind::None,
            target: EsTarget::ES2022,
        }
    }

    /// Set the JSX factory and fragment symbols.
    #[must_use]
    pub fn with_jsx(mut self, factory: impl Into<String>, fragment: impl Into<String>) -> Self {
        self.jsx_factory = factory.into();
        self.jsx_fragment = fragment.into();
        self
    }

    #[must_use]
    pub fn with_sourcemaps(mut self, kind: SourceMapKind) -> Self {
        self.sourcemaps = kind;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: EsTarget) -> Self {
        self.target = target;
        self
    }

    /// File name used in diagnostics and the source map `sources` list.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.input_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("input.js")
    }
}

/// ES module code produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranspileOutput {
    /// Carries the inline source map comment when one was requested.
    pub code: String,
    /// Source map JSON, kept alongside even when inlined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<String>,
}

impl TranspileOutput {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            source_map: None,
        }
    }

    #[must_use]
    pub fn with_source_map(mut self, map_json: impl Into<String>) -> Self {
        self.source_map = Some(map_json.into());
        self
    }

    /// Append the source map to the code as an inline data URL comment.
    #[must_use]
    pub fn inline_source_map(mut self) -> Self {
        use base64::Engine as _;

        if let Some(map) = &self.source_map {
            let encoded = base64::engine::general_purpose::STANDARD.encode(map.as_bytes());
            if !self.code.ends_with('\n') {
                self.code.push('\n');
            }
            self.code
                .push_str("//# sourceMappingURL=data:application/json;base64,");
            self.code.push_str(&encoded);
            self.code.push('\n');
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names_match_config_values() {
        let parsed: Vec<EsTarget> = serde_json::from_str(r#"["es2015", "es2022", "esnext"]"#).unwrap();
        assert_eq!(parsed, [EsTarget::ES2015, EsTarget::ES2022, EsTarget::ESNext]);
    }

    #[test]
    fn test_transpile_spec_defaults() {
        let spec = TranspileSpec::new("src/App.tsx", Dialect::Tsx);
        assert_eq!(spec.jsx_factory, "React.createElement");
        assert_eq!(spec.jsx_fragment, "React.Fragment");
        assert_eq!(spec.sourcemaps, SourceMapKind::None);
        assert_eq!(spec.target, EsTarget::ES2022);
        assert_eq!(spec.file_name(), "App.tsx");
    }

    #[test]
    fn test_transpile_spec_builder() {
        let spec = TranspileSpec::new("src/App.jsx", Dialect::Jsx)
            .with_jsx("h", "Fragment")
            .with_sourcemaps(SourceMapKind::Inline)
            .with_target(EsTarget::ES2020);

        assert_eq!(spec.jsx_factory, "h");
        assert_eq!(spec.jsx_fragment, "Fragment");
        assert_eq!(spec.sourcemaps, SourceMapKind::Inline);
        assert_eq!(spec.target, EsTarget::ES2020);
    }

    #[test]
    fn test_diagnostic_location_serialization() {
        let bare = serde_json::to_value(Diagnostic::error("Expected ';'")).unwrap();
        assert_eq!(bare, serde_json::json!({"severity": "error", "message": "Expected ';'"}));

        let located = Diagnostic::error("Expected ';'").with_location(PathBuf::from("src/App.tsx"), 3, 14);
        let json = serde_json::to_value(&located).unwrap();
        assert_eq!(json["line"], 3);
        assert_eq!(json["column"], 14);
    }

    #[test]
    fn test_inline_source_map_appends_comment() {
        let output = TranspileOutput::new("const x = 1;")
            .with_source_map(r#"{"version":3}"#)
            .inline_source_map();

        assert!(output.code.starts_with("const x = 1;\n"));
        assert!(output
            .code
            .contains("//# sourceMappingURL=data:application/json;base64,"));
        // base64 of {"version":3}
        assert!(output.code.contains("eyJ2ZXJzaW9uIjozfQ=="));
    }

    #[test]
    fn test_inline_source_map_without_map_is_noop() {
        let output = TranspileOutput::new("const x = 1;").inline_source_map();
        assert_eq!(output.code, "const x = 1;");
    }
}
