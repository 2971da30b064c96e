//! Error types for InsightMatch.
//!
//! Library crates use [`InsightMatchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! None of these errors cross a collector's public boundary: collectors turn
//! them into a [`DegradeReason`](crate::DegradeReason) and return sample data.

use std::path::PathBuf;

/// Top-level error type for all InsightMatch operations.
#[derive(Debug, thiserror::Error)]
pub enum InsightMatchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Timeout, refused connection, non-2xx status, unreadable body.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed archive, XML, HTML or JSON payload.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// No registry candidate met the matching thresholds.
    #[error("no registry entry matches {name:?}")]
    ResolutionMiss { name: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (blank URL, bad strategy name, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, InsightMatchError>;

impl InsightMatchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a transport error from any displayable message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Registry lookup miss for `name`.
    pub fn resolution_miss(name: impl Into<String>) -> Self {
        Self::ResolutionMiss { name: name.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
