//! Error types for TalkMeta.
//!
//! Library crates use [`TalkMetaError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all TalkMeta operations.
#[derive(Debug, thiserror::Error)]
pub enum TalkMetaError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure while fetching the conference program.
    #[error("network error: {0}")]
    Network(String),

    /// The program source was fetched but could not be understood.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The stage refused to run because its definition did not validate.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A declared column has no position in the row buffer.
    #[error("binding error: {message}")]
    Binding { message: String },

    /// Host-side lifecycle failure (bad upstream data, lifecycle misuse).
    #[error("stage error: {0}")]
    Stage(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TalkMetaError>;

impl TalkMetaError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a binding error from any displayable message.
    pub fn binding(msg: impl Into<String>) -> Self {
        Self::Binding {
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

    /// Whether retrying the same operation could plausibly succeed.
    ///
    /// Only transport failures qualify; a malformed program stays malformed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
