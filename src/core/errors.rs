//! CHR-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, ShellError>;

/// Top-level error type for the shell engine.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("[CHR-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[CHR-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[CHR-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[CHR-2001] route table parse failure: {details}")]
    RouteParse { details: String },

    #[error("[CHR-2002] no route matches {path}")]
    UnknownRoute { path: String },

    #[error("[CHR-2003] affixed views were already seeded for this session")]
    AffixAlreadySeeded,

    #[error("[CHR-2004] script line {line}: {details}")]
    ScriptParse { line: usize, details: String },

    #[error("[CHR-3001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[CHR-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ShellError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "CHR-1001",
            Self::MissingConfig { .. } => "CHR-1002",
            Self::ConfigParse { .. } => "CHR-1003",
            Self::RouteParse { .. } => "CHR-2001",
            Self::UnknownRoute { .. } => "CHR-2002",
            Self::AffixAlreadySeeded => "CHR-2003",
            Self::ScriptParse { .. } => "CHR-2004",
            Self::Serialization { .. } => "CHR-3001",
            Self::Io { .. } => "CHR-3002",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for ShellError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for ShellError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
