//! Configuration for a mirror session.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::client::{DEFAULT_BASE_URL, Endpoints};
use crate::mirror::{DEFAULT_BATCH_SIZE, DEFAULT_ICON_THEME};
use crate::transport::{DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT, DEFAULT_REQUEST_TIMEOUT};
use crate::user_agent::default_user_agent;
use crate::version::{BuildVersion, VersionError};

/// Default base delay for retry backoff.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Errors found while validating a [`MirrorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No target builds were given.
    #[error("at least one target build is required")]
    NoBuilds,

    /// A target build could not be parsed.
    #[error("invalid target build '{raw}': {source}")]
    InvalidBuild {
        /// The rejected build text.
        raw: String,
        /// The parse failure.
        #[source]
        source: VersionError,
    },

    /// The per-attempt timeout was zero.
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    /// The release batch size was zero.
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,

    /// The output directory was empty.
    #[error("output directory must not be empty")]
    EmptyOutputDir,

    /// The repository base URL is unusable.
    #[error("invalid repository base URL: {url}")]
    InvalidBaseUrl {
        /// The rejected value.
        url: String,
    },
}

/// Everything a [`crate::session::MirrorSession`] needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Root of the mirror tree.
    pub output_dir: PathBuf,

    /// Target product builds, e.g. `IC-241.14494`.
    pub builds: Vec<String>,

    /// Mirror every historical release instead of the listed ones.
    pub mirror_all_versions: bool,

    /// Requests allowed to start per second (0 disables limiting).
    pub rate_limit: usize,

    /// Deadline for each request attempt.
    pub request_timeout: Duration,

    /// Retries after the initial attempt for transient failures.
    pub max_retries: u32,

    /// First backoff delay; doubles on every retry.
    pub retry_base_delay: Duration,

    /// Releases per batch in all-versions mode.
    pub batch_size: usize,

    /// Repository base URL.
    pub base_url: String,

    /// Icon theme fetched next to the default icon.
    pub icon_theme: Option<String>,

    /// User-Agent header value.
    pub user_agent: String,
}

impl MirrorConfig {
    /// Creates a config with defaults for everything but the output and builds.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, builds: Vec<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            builds,
            mirror_all_versions: false,
            rate_limit: DEFAULT_RATE_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            batch_size: DEFAULT_BATCH_SIZE,
            base_url: DEFAULT_BASE_URL.to_string(),
            icon_theme: Some(DEFAULT_ICON_THEME.to_string()),
            user_agent: default_user_agent(),
        }
    }

    /// Checks the config and returns the parsed target builds.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<Vec<BuildVersion>, ConfigError> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputDir);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if Endpoints::new(&self.base_url).is_err() {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
            });
        }

        let builds = self
            .builds
            .iter()
            .map(|raw| parse_build(raw))
            .collect::<Result<Vec<_>, _>>()?;
        if builds.is_empty() {
            return Err(ConfigError::NoBuilds);
        }

        debug!(builds = builds.len(), "configuration validated");
        Ok(builds)
    }
}

fn parse_build(raw: &str) -> Result<BuildVersion, ConfigError> {
    let build = BuildVersion::parse(raw).map_err(|source| ConfigError::InvalidBuild {
        raw: raw.to_string(),
        source,
    })?;
    if !build.is_valid() {
        return Err(ConfigError::InvalidBuild {
            raw: raw.to_string(),
            source: VersionError::malformed(raw, raw),
        });
    }
    Ok(build)
}
