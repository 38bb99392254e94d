//! Error types for the Firestore export tools.
//!
//! Library crates use [`FsExportError`] via `thiserror`.
//! The binaries wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all export, query, and projection operations.
#[derive(Debug, thiserror::Error)]
pub enum FsExportError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A required input directory or file does not exist.
    #[error("input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A single exported record could not be turned into a document.
    #[error("record parse error: {message}")]
    RecordParse { message: String },

    /// A query referenced an unknown collection, index, or field.
    #[error("not found: {message}")]
    QueryNotFound { message: String },

    /// A value or document could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data validation error (invalid document shape, empty selection, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FsExportError>;

impl FsExportError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an input-not-found error for the given path.
    pub fn input_not_found(path: impl Into<PathBuf>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    /// Create a record parse error from any displayable message.
    pub fn record_parse(msg: impl Into<String>) -> Self {
        Self::RecordParse {
            message: msg.into(),
        }
    }

    /// Create a query-not-found error from any displayable message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::QueryNotFound {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FsExportError::config("unknown grouping");
        assert_eq!(err.to_string(), "config error: unknown grouping");

        let err = FsExportError::input_not_found("/no/such/export");
        assert_eq!(err.to_string(), "input not found: /no/such/export");

        let err = FsExportError::not_found("collection 'songs'");
        assert!(err.to_string().contains("'songs'"));
    }
}
