//! Error types for songsync-http.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from an outbound request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection refused, DNS failure, timeout or a body read cut short.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The body was expected to be JSON and was not.
    #[error("malformed JSON from {url}: {source}")]
    MalformedJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Local filesystem failure while storing a download. Never retried.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every attempt allowed by the retry policy failed.
    #[error("{label} failed after {attempts} attempts: {last}")]
    Exhausted {
        label: String,
        attempts: u32,
        #[source]
        last: Box<HttpError>,
    },
}

impl HttpError {
    /// Whether another attempt of the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HttpError::Transport { .. } | HttpError::Status { .. } | HttpError::MalformedJson { .. }
        )
    }

    /// The error behind an [`HttpError::Exhausted`] wrapper, or `self`.
    pub fn root(&self) -> &HttpError {
        match self {
            HttpError::Exhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

impl From<(&str, ureq::Error)> for HttpError {
    fn from((url, err): (&str, ureq::Error)) -> Self {
        match err {
            ureq::Error::Status(status, _) => HttpError::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(t) => HttpError::Transport {
                url: url.to_string(),
                message: t.to_string(),
            },
        }
    }
}

/// Convenience constructor for [`HttpError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> HttpError {
    HttpError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`HttpError::Transport`].
pub(crate) fn transport_err(url: &str, message: impl ToString) -> HttpError {
    HttpError::Transport {
        url: url.to_string(),
        message: message.to_string(),
    }
}
