use std::error::Error as _;

use crate::client::ClientError;
use crate::mirror::{ErrorKind, FetchError};
use crate::transport::TransportError;

/// Reason reported when a download names no file.
pub(crate) const MISSING_FILE_INFORMATION: &str = "failed to retrieve file information";

pub(super) fn classify_fetch_error(error: &FetchError) -> ErrorKind {
    match error {
        FetchError::Client(ClientError::Transport(transport)) => match transport {
            TransportError::Timeout { .. } => ErrorKind::Timeout,
            TransportError::Cancelled { .. } => ErrorKind::Cancelled,
            TransportError::HttpStatus { .. } => ErrorKind::Unknown,
            TransportError::Network { .. }
            | TransportError::InvalidUrl { .. }
            | TransportError::RedirectLoop { .. }
            | TransportError::ClientBuild { .. } => ErrorKind::Exception,
        },
        FetchError::Client(ClientError::Manifest { .. }) => ErrorKind::InvalidResponse,
        FetchError::Client(ClientError::MissingFileInformation { .. }) | FetchError::Status { .. } => {
            ErrorKind::Unknown
        }
        FetchError::Client(ClientError::InvalidBaseUrl { .. }) | FetchError::Io { .. } => {
            ErrorKind::Exception
        }
    }
}

pub(super) fn failure_reason(error: &FetchError) -> String {
    match error {
        FetchError::Status { reason, .. } => reason.clone(),
        FetchError::Client(ClientError::MissingFileInformation { .. }) => {
            MISSING_FILE_INFORMATION.to_string()
        }
        other => other.to_string(),
    }
}

/// Joins the source chain below the top-level message, if there is one.
pub(super) fn failure_cause(error: &FetchError) -> Option<String> {
    let mut causes = Vec::new();
    let mut current = error.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    (!causes.is_empty()).then(|| causes.join(": "))
}
