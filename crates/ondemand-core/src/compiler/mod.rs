//! Source-to-module compilation.
//!
//! The loader builds a [`TranspileSpec`] per file and passes it with the
//! source text to a [`CompilerBackend`]. [`SwcBackend`] is the only backend
//! shipped; tests wrap it to count calls.

pub mod spec;
pub mod swc;

pub use spec::{
    Diagnostic, DiagnosticSeverity, EsTarget, SourceMapKind, TranspileOutput, TranspileSpec,
    DEFAULT_JSX_FACTORY, DEFAULT_JSX_FRAGMENT,
};
pub use swc::SwcBackend;

use std::fmt;

/// What stage of compilation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerErrorKind {
    /// Source could not be parsed.
    Parse,
    /// Code generation or source-map output failed.
    Transform,
    /// A JSON module is not valid JSON.
    InvalidData,
}

impl CompilerErrorKind {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Parse => "COMPILER_PARSE_ERROR",
            Self::Transform => "COMPILER_TRANSFORM_ERROR",
            Self::InvalidData => "COMPILER_INVALID_DATA",
        }
    }
}

/// A backend rejected a source file.
#[derive(Debug)]
pub struct CompilerError {
    pub kind: CompilerErrorKind,
    pub message: String,
    /// Located parser messages, first one is the primary.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompilerError {
    fn new(kind: CompilerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(CompilerErrorKind::Parse, message)
    }

    #[must_use]
    pub fn transform_error(message: impl Into<String>) -> Self {
        Self::new(CompilerErrorKind::Transform, message)
    }

    #[must_use]
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(CompilerErrorKind::InvalidData, message)
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Stable code, e.g. `COMPILER_PARSE_ERROR`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Line and column of the first located diagnostic.
    #[must_use]
    pub fn location(&self) -> Option<(u32, u32)> {
        self.diagnostics.iter().find_map(|d| d.line.zip(d.column))
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)?;
        for diag in &self.diagnostics {
            write!(f, "\n  - {}: {}", diag.severity, diag.message)?;
            if let (Some(file), Some((line, col))) = (&diag.file, diag.line.zip(diag.column)) {
                write!(f, " at {}:{line}:{col}", file.display())?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for CompilerError {}

/// Turns one source file into a standalone ES module.
///
/// Backends are shared across concurrent loads.
pub trait CompilerBackend: Send + Sync {
    /// Short backend identifier, recorded on the `load` span.
    fn name(&self) -> &'static str;

    fn transpile(&self, spec: &TranspileSpec, source: &str)
        -> Result<TranspileOutput, CompilerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_codes_per_kind() {
        assert_eq!(CompilerError::parse_error("x").code(), "COMPILER_PARSE_ERROR");
        assert_eq!(
            CompilerError::transform_error("x").code(),
            "COMPILER_TRANSFORM_ERROR"
        );
        assert_eq!(CompilerError::invalid_data("x").code(), "COMPILER_INVALID_DATA");
    }

    #[test]
    fn test_display_lists_located_diagnostics() {
        let err = CompilerError::parse_error("Failed to parse src/App.tsx").with_diagnostics(vec![
            Diagnostic::error("Expected '>'").with_location(PathBuf::from("src/App.tsx"), 3, 14),
            Diagnostic::error("Unterminated JSX"),
        ]);

        let shown = err.to_string();
        assert!(shown.starts_with("COMPILER_PARSE_ERROR: Failed to parse src/App.tsx"));
        assert!(shown.contains("Expected '>' at src/App.tsx:3:14"));
        assert!(shown.ends_with("Unterminated JSX"));
        assert_eq!(err.location(), Some((3, 14)));
    }

    #[test]
    fn test_location_skips_unlocated_diagnostics() {
        let err = CompilerError::invalid_data("bad json").with_diagnostics(vec![
            Diagnostic::error("first"),
            Diagnostic::error("second").with_location(PathBuf::from("a.json"), 2, 1),
        ]);
        assert_eq!(err.location(), Some((2, 1)));
        assert_eq!(CompilerError::transform_error("boom").location(), None);
    }
}
