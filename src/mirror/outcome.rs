//! Per-release results of a mirror run.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::model::Plugin;

/// A release scheduled for mirroring, with the category it was listed under.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    /// Category name from the listing the release came from.
    pub category: String,

    /// The release record.
    pub plugin: Plugin,
}

impl Release {
    /// Creates a release entry.
    #[must_use]
    pub fn new(category: impl Into<String>, plugin: Plugin) -> Self {
        Self {
            category: category.into(),
            plugin,
        }
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.plugin.name, self.plugin.version)
    }
}

/// What a successful outcome did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadAction {
    /// The artifact was fetched and placed.
    Downloaded,
    /// A correctly sized artifact was already present.
    Skipped,
}

/// Classification of a failed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An attempt exceeded its deadline after retries ran out.
    Timeout,
    /// The session was cancelled while the artifact was in flight.
    Cancelled,
    /// Unexpected fault, such as a network or file system error.
    Exception,
    /// Non-2xx response or missing required metadata.
    Unknown,
    /// A response body could not be interpreted.
    InvalidResponse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Exception => "exception",
            Self::Unknown => "unknown",
            Self::InvalidResponse => "invalid response",
        };
        f.write_str(name)
    }
}

/// Terminal state of one release.
///
/// Produced once per release and never mutated afterwards.
#[derive(Debug, Clone)]
pub enum DownloadOutcome {
    /// The artifact is present on disk.
    Success {
        release: Arc<Release>,
        action: DownloadAction,
    },
    /// The artifact could not be mirrored.
    Failure {
        release: Arc<Release>,
        kind: ErrorKind,
        reason: String,
        cause: Option<String>,
    },
}

impl DownloadOutcome {
    /// Creates a success outcome.
    #[must_use]
    pub fn success(release: Arc<Release>, action: DownloadAction) -> Self {
        Self::Success { release, action }
    }

    /// Creates a failure outcome.
    #[must_use]
    pub fn failure(
        release: Arc<Release>,
        kind: ErrorKind,
        reason: impl Into<String>,
        cause: Option<String>,
    ) -> Self {
        Self::Failure {
            release,
            kind,
            reason: reason.into(),
            cause,
        }
    }

    /// The release this outcome is about.
    #[must_use]
    pub fn release(&self) -> &Arc<Release> {
        match self {
            Self::Success { release, .. } | Self::Failure { release, .. } => release,
        }
    }

    /// Shortcut for `release().plugin`.
    #[must_use]
    pub fn plugin(&self) -> &Plugin {
        &self.release().plugin
    }

    /// Returns true for either success action.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The success action, if any.
    #[must_use]
    pub fn action(&self) -> Option<DownloadAction> {
        match self {
            Self::Success { action, .. } => Some(*action),
            Self::Failure { .. } => None,
        }
    }

    /// The failure kind, if any.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release() -> Arc<Release> {
        Arc::new(Release::new("Tools", Plugin::new("demo", "Demo", "1.0")))
    }

    #[test]
    fn test_success_accessors() {
        let outcome = DownloadOutcome::success(release(), DownloadAction::Skipped);
        assert!(outcome.is_success());
        assert_eq!(outcome.action(), Some(DownloadAction::Skipped));
        assert_eq!(outcome.error_kind(), None);
        assert_eq!(outcome.plugin().id, "demo");
    }

    #[test]
    fn test_failure_accessors() {
        let outcome = DownloadOutcome::failure(release(), ErrorKind::Unknown, "Not Found", None);
        assert!(!outcome.is_success());
        assert_eq!(outcome.action(), None);
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Unknown));
        assert_eq!(outcome.release().category, "Tools");
    }

    #[test]
    fn test_release_display() {
        assert_eq!(release().to_string(), "Demo 1.0");
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InvalidResponse).unwrap_or_default();
        assert_eq!(json, "\"invalid_response\"");
    }
}
