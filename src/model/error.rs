//! Error types for manifest encoding and decoding.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while reading or writing a `plugin-repository` manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The body was not a well-formed manifest.
    #[error("failed to decode plugin manifest: {source}")]
    Decode {
        /// The underlying XML error.
        #[source]
        source: quick_xml::DeError,
    },

    /// The document root is not `plugin-repository` (e.g. an HTML error page).
    #[error("unexpected manifest root element: {}", found.as_deref().unwrap_or("<none>"))]
    UnexpectedRoot {
        /// The root element actually found, if any.
        found: Option<String>,
    },

    /// The in-memory repository could not be rendered.
    #[error("failed to encode plugin manifest: {source}")]
    Encode {
        /// The underlying XML error.
        #[source]
        source: quick_xml::SeError,
    },

    /// File system error while persisting the manifest.
    #[error("IO error writing manifest {path}: {source}")]
    Io {
        /// The manifest or scratch path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    /// Creates a decode error.
    pub fn decode(source: quick_xml::DeError) -> Self {
        Self::Decode { source }
    }

    /// Creates an encode error.
    pub fn encode(source: quick_xml::SeError) -> Self {
        Self::Encode { source }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
