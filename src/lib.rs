//! Plugin Mirror Library
//!
//! Mirrors a JetBrains-style plugin repository into a local directory tree
//! that can be served as a custom plugin repository.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`slug`] - Filesystem-safe names for categories and plugins
//! - [`version`] - Build identifiers and compatibility ranges
//! - [`model`] - Repository listing model and its XML form
//! - [`transport`] - Rate-limited, retrying, redirect-following HTTP
//! - [`client`] - Typed access to the repository endpoints
//! - [`merge`] - Deduplicating merge of several listings
//! - [`mirror`] - Download orchestration and the output manifest
//! - [`session`] - End-to-end pipeline and its report
//! - [`config`] - Session configuration and validation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod merge;
pub mod mirror;
pub mod model;
pub mod session;
pub mod slug;
pub mod transport;
pub mod user_agent;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use client::{ClientError, DEFAULT_BASE_URL, PluginRepositoryClient};
pub use config::{ConfigError, MirrorConfig};
pub use merge::merge_repositories;
pub use mirror::{
    DEFAULT_BATCH_SIZE, DownloadAction, DownloadOutcome, ErrorKind, MirrorEngine, MirrorLayout,
    MirrorStats,
};
pub use model::{Category, ManifestError, Plugin, Repository};
pub use session::{BuildFailure, MirrorReport, MirrorSession, ReleaseFailure, SessionError};
pub use slug::slugify;
pub use transport::{
    DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT, HttpTransport, RateLimiter, ReqwestTransport,
    ResilientTransport, RetryPolicy, TransportError,
};
pub use version::{BuildVersion, VersionError, VersionRange};
