//! Per-artifact fetch errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::client::ClientError;

/// Why a single artifact could not be mirrored.
///
/// These never escape the orchestrator; each one becomes a
/// [`super::DownloadOutcome::Failure`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The client could not obtain or interpret a response.
    #[error(transparent)]
    Client(ClientError),

    /// The final response had a non-2xx status.
    #[error("HTTP {status}: {reason}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Reason phrase reported for the status.
        reason: String,
    },

    /// File system error while staging or placing the artifact.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Wraps a client failure.
    pub fn client(source: ClientError) -> Self {
        Self::Client(source)
    }

    /// Creates a status error.
    pub fn status(status: u16, reason: impl Into<String>) -> Self {
        Self::Status {
            status,
            reason: reason.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
