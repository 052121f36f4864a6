//! Error taxonomy for crosslink runs
//!
//! Every failure surfaces immediately to the caller of the top-level
//! operation. There are no retries and no cross-module rollback.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while locating, parsing, or rewriting module manifests
#[derive(Debug, Error)]
pub enum CrosslinkError {
    /// No `go.mod` at the configured root
    #[error("no go.mod found at repository root {}", root.display())]
    RootInvalid { root: PathBuf },

    /// A manifest could not be parsed
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A rewritten manifest could not be persisted
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a manifest or walking the tree failed
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A skip pattern is not a valid glob
    #[error("invalid skip pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Two manifests declare the same module identity
    #[error("module {identity} declared by both {} and {}", first.display(), second.display())]
    DuplicateModule {
        identity: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The configuration file could not be deserialized
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CrosslinkError>;

impl CrosslinkError {
    pub(crate) fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        CrosslinkError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_includes_location() {
        let err = CrosslinkError::parse("a/go.mod", 3, "unknown directive `foo`");
        assert_eq!(err.to_string(), "a/go.mod:3: unknown directive `foo`");
    }

    #[test]
    fn test_root_invalid_display() {
        let err = CrosslinkError::RootInvalid {
            root: PathBuf::from("/tmp/nowhere"),
        };
        assert!(err.to_string().contains("/tmp/nowhere"));
    }
}
