//! Error types for build identifier parsing.

use thiserror::Error;

/// Errors produced while parsing a build identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// A dotted component was neither an unsigned integer nor `*`.
    #[error("malformed version {raw:?}: component {component:?} is not a number or '*'")]
    MalformedVersion {
        /// The full text that was being parsed.
        raw: String,
        /// The offending component.
        component: String,
    },
}

impl VersionError {
    /// Creates a malformed version error.
    pub fn malformed(raw: impl Into<String>, component: impl Into<String>) -> Self {
        Self::MalformedVersion {
            raw: raw.into(),
            component: component.into(),
        }
    }
}
