//! Error types for songsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use songsync_core::ConfigError;
use songsync_http::HttpError;

/// All errors that can arise from a sync pass.
///
/// Only [`SyncError::Listing`] and [`SyncError::Config`] abort a pass; the
/// rest are confined to the record or artifact they occurred on.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid configuration handed to the engine.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The authoritative record list could not be obtained.
    #[error("record listing failed: {message}")]
    Listing { message: String },

    /// An outbound request failed after its retry budget.
    #[error("{0}")]
    Http(#[from] HttpError),

    /// The search returned no usable candidate.
    #[error("no search match for '{query}'")]
    NoMatch { query: String },

    /// The details lookup returned no media URL.
    #[error("no media URL for remote id {id}")]
    DetailsUnavailable { id: String },

    /// A response arrived intact but did not have the expected shape.
    #[error("unexpected {endpoint} response: {source}")]
    UnexpectedShape {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Listing`].
pub(crate) fn listing_err(message: impl Into<String>) -> SyncError {
    SyncError::Listing {
        message: message.into(),
    }
}
