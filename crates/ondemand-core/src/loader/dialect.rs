//! Source dialect selection by file extension.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Syntax dialect of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// TypeScript.
    #[default]
    Ts,
    /// TypeScript with markup.
    Tsx,
    /// JavaScript with markup.
    Jsx,
    /// Plain JavaScript.
    Js,
    /// JSON data.
    Json,
}

impl Dialect {
    /// Dialect for a file extension (without the dot). Unknown extensions are
    /// treated as TypeScript.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "tsx" => Self::Tsx,
            "jsx" => Self::Jsx,
            "js" | "mjs" => Self::Js,
            "json" => Self::Json,
            _ => Self::Ts,
        }
    }

    /// Dialect for a path, by its extension.
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        Self::from_extension(path.extension().and_then(|e| e.to_str()).unwrap_or(""))
    }

    /// Whether the source carries type annotations.
    #[must_use]
    pub fn is_typed(self) -> bool {
        matches!(self, Self::Ts | Self::Tsx)
    }

    /// Whether the source may contain markup.
    #[must_use]
    pub fn has_markup(self) -> bool {
        matches!(self, Self::Tsx | Self::Jsx)
    }

    /// Typed or markup source. These must be transformed before a host can load them.
    #[must_use]
    pub fn needs_transform(self) -> bool {
        self.is_typed() || self.has_markup()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ts => "ts",
            Self::Tsx => "tsx",
            Self::Jsx => "jsx",
            Self::Js => "js",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
