use crate::compiler::CompilerError;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for ondemand operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The transformer rejected a source file.
    #[error("Failed to transform {}: {source}", file.display())]
    Transform {
        file: PathBuf,
        #[source]
        source: CompilerError,
    },

    /// A dependency discovered while rewriting imports failed to materialize.
    #[error("Failed to transform dependency {}: {source}", path.display())]
    DependencyTransform {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// The host runtime could not import a generated module.
    #[error("Failed to import {url}: {message}")]
    Import { url: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Short stable code for the error kind, used in diagnostics records.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::ConfigRead { .. } => "CONFIG_READ",
            Self::ConfigParse { .. } => "CONFIG_PARSE",
            Self::FileNotFound { .. } => "FILE_NOT_FOUND",
            Self::Transform { .. } => "SYNTAX_TRANSFORM_ERROR",
            Self::DependencyTransform { .. } => "DEPENDENCY_TRANSFORM_FAILURE",
            Self::Import { .. } => "IMPORT_FAILED",
            Self::Other(_) => "OTHER",
        }
    }

    /// The innermost error, unwrapping dependency chains.
    #[must_use]
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::DependencyTransform { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_dependency_chain() {
        let inner = Error::Transform {
            file: PathBuf::from("/p/src/b.tsx"),
            source: CompilerError::parse_error("Unexpected token"),
        };
        let outer = Error::DependencyTransform {
            path: PathBuf::from("/p/src/a.tsx"),
            source: Box::new(Error::DependencyTransform {
                path: PathBuf::from("/p/src/b.tsx"),
                source: Box::new(inner),
            }),
        };

        assert_eq!(outer.code(), "DEPENDENCY_TRANSFORM_FAILURE");
        assert_eq!(outer.root_cause().code(), "SYNTAX_TRANSFORM_ERROR");
        assert!(outer.to_string().contains("/p/src/a.tsx"));
    }

    #[test]
    fn test_file_not_found_display() {
        let err = Error::FileNotFound {
            path: PathBuf::from("/p/missing.tsx"),
        };
        assert_eq!(err.to_string(), "File not found: /p/missing.tsx");
    }
}
