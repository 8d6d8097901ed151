//! Error types for jobsweep.
//!
//! Library crates use [`JobsweepError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all jobsweep operations.
#[derive(Debug, thiserror::Error)]
pub enum JobsweepError {
    /// Configuration loading or parse error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a job source.
    #[error("network error: {0}")]
    Network(String),

    /// A metered source told us to slow down (HTTP 429).
    #[error("rate limited by {source_name}")]
    RateLimited { source_name: String },

    /// Response body or listing markup could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Dedup registry error (open, query, or insert).
    #[error("storage error: {0}")]
    Storage(String),

    /// Downstream sink error (initialization or write).
    #[error("sink error: {0}")]
    Sink(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config values the pipeline cannot run with.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Another pipeline run holds the single-flight guard.
    #[error("a pipeline run is already in progress")]
    RunInProgress,

    /// The run exceeded its wall-clock budget.
    #[error("pipeline run timed out after {0:?}")]
    Timeout(Duration),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, JobsweepError>;

impl JobsweepError {
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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a rate-limit error for the named source.
    pub fn rate_limited(source_name: impl Into<String>) -> Self {
        Self::RateLimited {
            source_name: source_name.into(),
        }
    }

    /// Whether this error is a rate-limit signal from a metered source.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
