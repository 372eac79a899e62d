// crates/client/src/error.rs
//! Error types for the sync client.

use thiserror::Error;

/// Errors surfaced by [`crate::ApiClient`] and the components built on it.
///
/// None of these are fatal to a polling/stream loop: pollers keep their
/// last-good state and retry on the next tick, and the feed reconnects.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network unreachable, connection reset, timeout — anything below HTTP.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// A 2xx body that did not match the expected shape.
    #[error("failed to decode response: {message}")]
    Decode { message: String },

    /// An admin operation was attempted without an admin token configured.
    #[error("admin token not configured")]
    AdminTokenMissing,
}

impl ApiError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }

    /// True for failures below the HTTP layer. Drives the award processor's
    /// offline fallback: server-reported errors do NOT count.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// HTTP status code, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors from [`crate::AwardProcessor::award`]: either the request failed
/// in a non-degradable way, or the offline fallback itself broke.
#[derive(Debug, Error)]
pub enum AwardError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("offline fallback failed: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the local stats store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error accessing stats file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed stats file {path}: {message}")]
    Malformed {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("no writable data directory found")]
    NoDataDir,
}
