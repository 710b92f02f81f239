//! Error types for the transport layer.
//!
//! Every variant carries the URL it concerns so failures can be attributed to
//! a specific request once they surface in a download outcome.

use std::time::Duration;

use thiserror::Error;

/// Boxed lower-level cause, independent of the HTTP backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while issuing a request or reading its body.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS resolution, connection reset, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL being requested.
        url: String,
        /// The underlying error.
        #[source]
        source: BoxError,
    },

    /// A single attempt exceeded its deadline.
    #[error("timeout after {}ms requesting {url}", after.as_millis())]
    Timeout {
        /// The URL being requested.
        url: String,
        /// The deadline that expired.
        after: Duration,
    },

    /// The session was cancelled while the request was pending.
    #[error("request to {url} cancelled")]
    Cancelled {
        /// The URL being requested.
        url: String,
    },

    /// Non-success response where a success was required.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Reason phrase, if one was available.
        reason: Option<String>,
    },

    /// The URL could not be built or resolved.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
    },

    /// Redirects did not settle within the hop limit.
    #[error("too many redirects ({hops}) starting from {url}")]
    RedirectLoop {
        /// The URL the chain started from.
        url: String,
        /// Number of hops followed before giving up.
        hops: usize,
    },

    /// The HTTP backend could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying error.
        #[source]
        source: BoxError,
    },
}

impl TransportError {
    /// Creates a network error.
    pub fn network(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Network {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            after,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16, reason: Option<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            reason,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a redirect loop error.
    pub fn redirect_loop(url: impl Into<String>, hops: usize) -> Self {
        Self::RedirectLoop {
            url: url.into(),
            hops,
        }
    }

    /// Creates a client construction error.
    pub fn client_build(source: impl Into<BoxError>) -> Self {
        Self::ClientBuild {
            source: source.into(),
        }
    }

    /// Returns true for [`TransportError::Timeout`].
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true for [`TransportError::Cancelled`].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
