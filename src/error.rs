//! Crate-wide error types.
//!
//! Every synchronous store or query operation returns [`Result`]. The
//! variants mirror how callers are expected to react:
//!
//! - [`Error::Storage`]: a persisted manifest or cache file is unreadable or
//!   corrupt. Never auto-repaired, always surfaced.
//! - [`Error::NotFound`]: unknown track, unknown variant identity, or no
//!   in-flight download.
//! - [`Error::InvalidOperation`]: a disallowed mutation, e.g. deleting the
//!   default variant.
//! - [`Error::UnsupportedOperation`]: the variant kind cannot do that
//!   (only hosted variants download).
//! - [`Error::Transport`] / [`Error::Parse`]: network and JSON failures.
//!
//! Module-specific errors ([`FetchError`], [`ConfigError`]) convert into
//! [`Error`] through `?`.
//!
//! [`FetchError`]: crate::fetch::FetchError
//! [`ConfigError`]: crate::config::ConfigError

use std::path::PathBuf;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unreadable or corrupt persisted state
    #[error("Storage error at {path}: {message}")]
    Storage { path: PathBuf, message: String },

    /// Unknown track, variant or download
    #[error("Not found: {0}")]
    NotFound(String),

    /// Mutation that is never allowed
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Operation the variant kind does not support
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Network or timeout failure
    #[error("Transport error: {0}")]
    Transport(#[from] crate::fetch::FetchError),

    /// Malformed remote or local JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a storage error.
    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an invalid operation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Create an unsupported operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("variant abc for track 911");
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().starts_with("Not found"));
    }

    #[test]
    fn test_storage_error_mentions_path() {
        let err = Error::storage("/data/manifests/911.json", "expected value at line 1");
        let msg = err.to_string();
        assert!(msg.contains("911.json"));
        assert!(msg.contains("expected value"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::invalid("cannot remove the default variant").context("track 911");
        let msg = err.to_string();
        assert!(msg.contains("track 911"));
        assert!(matches!(err.root(), Error::InvalidOperation(_)));
    }

    #[test]
    fn test_result_ext_on_io() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk full"));
        let err = result.with_context("writing manifest").unwrap_err();
        assert!(err.to_string().contains("writing manifest"));
        assert!(matches!(err.root(), Error::Io(_)));
    }
}
