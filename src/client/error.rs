//! Error types for repository client operations.

use thiserror::Error;

use crate::model::ManifestError;
use crate::transport::TransportError;

/// Errors returned by [`super::PluginRepositoryClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be completed, or the server refused it.
    #[error(transparent)]
    Transport(TransportError),

    /// A listing body was not a valid `plugin-repository` manifest.
    #[error("invalid listing from {url}: {source}")]
    Manifest {
        /// The listing URL.
        url: String,
        /// The decode failure.
        #[source]
        source: ManifestError,
    },

    /// A download response had no usable filename in its headers or URL.
    #[error("failed to retrieve file information for {url}")]
    MissingFileInformation {
        /// The final URL of the download.
        url: String,
    },

    /// The configured repository base URL is unusable.
    #[error("invalid repository base URL: {url}")]
    InvalidBaseUrl {
        /// The rejected value.
        url: String,
    },
}

impl ClientError {
    /// Wraps a transport failure.
    pub fn transport(source: TransportError) -> Self {
        Self::Transport(source)
    }

    /// Creates a manifest decode error for `url`.
    pub fn manifest(url: impl Into<String>, source: ManifestError) -> Self {
        Self::Manifest {
            url: url.into(),
            source,
        }
    }

    /// Creates a missing file information error.
    pub fn missing_file_information(url: impl Into<String>) -> Self {
        Self::MissingFileInformation { url: url.into() }
    }

    /// Creates an invalid base URL error.
    pub fn invalid_base_url(url: impl Into<String>) -> Self {
        Self::InvalidBaseUrl { url: url.into() }
    }

    /// Returns true if the underlying request timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// Returns true if the session was cancelled during the request.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_missing_file_information_message() {
        let error = ClientError::missing_file_information("https://x/plugin/download");
        assert_eq!(
            error.to_string(),
            "failed to retrieve file information for https://x/plugin/download"
        );
    }

    #[test]
    fn test_transport_is_transparent() {
        let error = ClientError::transport(TransportError::timeout("https://x", Duration::from_secs(5)));
        assert!(error.is_timeout());
        assert!(!error.is_cancelled());
        assert!(error.to_string().contains("https://x"));
    }

    #[test]
    fn test_cancelled_detected() {
        let error = ClientError::transport(TransportError::cancelled("https://x"));
        assert!(error.is_cancelled());
    }
}
