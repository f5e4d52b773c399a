//! Config Service Error Hierarchy
//!
//! Absence is never an error in this crate: a missing release, an unknown
//! namespace or a long poll with nothing to report are ordinary outcomes.
//! Errors here are configuration problems, durable-store failures and
//! process-level failures.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration source could not be read or deserialized
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration loaded but failed validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Durable store failures surfaced by a read path
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Filesystem failures (seed file, log directory)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Client request that cannot be served as sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed JSON in a seed file or request parameter
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    SignalSenderClosed(String),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Failures reported by a durable store implementation.
///
/// Cloneable so that one failed single-flight load can be handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Backend could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
