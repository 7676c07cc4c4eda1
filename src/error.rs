//! Error types for package resolution and page rendering.

use thiserror::Error;

/// Errors that can occur while resolving and rendering a page.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The registry has no record for the requested package.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request never produced a response (DNS, connect, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a status the caller cannot use.
    #[error("upstream returned HTTP {status} for {url}")]
    UpstreamStatus {
        /// Requested URL.
        url: String,
        /// Status code received.
        status: u16,
    },

    /// The body was not JSON, or not the expected shape.
    #[error("invalid response from {url}: {source}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// The registry record is internally inconsistent.
    #[error("malformed registry record for {name}: {reason}")]
    MalformedRecord {
        /// Package name.
        name: String,
        /// What was missing.
        reason: String,
    },

    /// Local JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for every failure caused by an upstream service rather than by
    /// the request itself.
    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::UpstreamStatus { .. }
                | Error::Decode { .. }
                | Error::MalformedRecord { .. }
        )
    }
}

/// A specialized Result type for site operations.
pub type Result<T> = std::result::Result<T, Error>;
