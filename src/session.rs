//! Mirror session: listing, merging, downloading, and reporting.
//!
//! A [`MirrorSession`] owns one transport stack and one cancellation token
//! for its whole lifetime. [`MirrorSession::mirror`] runs the pipeline:
//!
//! 1. fetch the listing for every target build (a failing build is recorded
//!    and skipped; only all builds failing is fatal)
//! 2. merge the listings, first-seen release wins
//! 3. create the output directories
//! 4. run the download orchestrator and write the manifest
//! 5. aggregate everything into a [`MirrorReport`]

use std::path::PathBuf;
use std::sync::Arc;

use indicatif::HumanBytes;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::client::{Endpoints, PluginRepositoryClient};
use crate::config::{ConfigError, MirrorConfig};
use crate::merge::merge_repositories;
use crate::mirror::{DownloadOutcome, EngineOptions, ErrorKind, MirrorEngine, MirrorLayout};
use crate::model::{ManifestError, Repository};
use crate::transport::{
    HttpTransport, RateLimiter, ReqwestTransport, ResilientTransport, RetryPolicy, TransportError,
};
use crate::version::BuildVersion;

/// Errors that stop a session as a whole.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP backend could not be created.
    #[error("failed to create HTTP backend: {0}")]
    Backend(#[source] TransportError),

    /// No target build produced a listing.
    #[error("all {builds} build listing(s) failed to fetch")]
    AllManifestsFailed {
        /// Number of builds attempted.
        builds: usize,
        /// Why each build failed.
        failures: Vec<BuildFailure>,
    },

    /// The output tree could not be created.
    #[error("failed to prepare output directory: {0}")]
    Prepare(#[source] std::io::Error),

    /// The output manifest could not be written.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// A target build whose listing could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildFailure {
    /// The build identifier as given.
    pub build: String,
    /// Error text.
    pub reason: String,
}

/// A release that could not be mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseFailure {
    pub id: String,
    pub name: String,
    pub version: String,
    pub category: String,
    pub kind: ErrorKind,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

/// Aggregate result of a session.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorReport {
    /// Builds whose listing was fetched.
    pub builds: Vec<String>,
    /// Builds whose listing failed.
    pub failed_builds: Vec<BuildFailure>,
    /// Sum of declared sizes over the merged listing.
    pub estimated_bytes: u64,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_downloaded: u64,
    pub icons_downloaded: usize,
    pub icons_skipped: usize,
    pub icons_failed: usize,
    /// Requests issued, retries included.
    pub requests: usize,
    pub retries: usize,
    /// Every failed release, in scheduling order.
    pub failures: Vec<ReleaseFailure>,
    /// Where the output manifest was written.
    pub manifest_path: PathBuf,
    /// Whether the session was cancelled before it finished.
    pub cancelled: bool,
}

impl MirrorReport {
    /// Returns true when every release and every build succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.failed_builds.is_empty() && !self.cancelled
    }
}

/// One mirror run against a repository.
pub struct MirrorSession {
    config: MirrorConfig,
    builds: Vec<BuildVersion>,
    transport: ResilientTransport,
    client: PluginRepositoryClient,
    engine: MirrorEngine,
    cancel: CancellationToken,
}

impl MirrorSession {
    /// Creates a session backed by a reqwest HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for an invalid config, or
    /// [`SessionError::Backend`] if the HTTP client cannot be built.
    pub fn new(config: MirrorConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let backend = ReqwestTransport::new(&config.user_agent).map_err(SessionError::Backend)?;
        Self::with_transport(config, Arc::new(backend))
    }

    /// Creates a session over an arbitrary transport.
    ///
    /// The transport is wrapped with the configured rate limit, timeout,
    /// retry policy, and redirect handling.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for an invalid config.
    pub fn with_transport(
        config: MirrorConfig,
        backend: Arc<dyn HttpTransport>,
    ) -> Result<Self, SessionError> {
        let builds = config.validate()?;
        let endpoints = Endpoints::new(&config.base_url).map_err(|_| {
            ConfigError::InvalidBaseUrl {
                url: config.base_url.clone(),
            }
        })?;

        let cancel = CancellationToken::new();
        let transport = ResilientTransport::new(backend)
            .with_rate_limiter(Arc::new(RateLimiter::per_second(config.rate_limit)))
            .with_retry_policy(
                RetryPolicy::with_max_retries(config.max_retries)
                    .with_base_delay(config.retry_base_delay),
            )
            .with_request_timeout(config.request_timeout)
            .with_cancellation(cancel.clone());

        let client = PluginRepositoryClient::with_endpoints(Arc::new(transport.clone()), endpoints);
        let engine = MirrorEngine::new(client.clone(), MirrorLayout::new(&config.output_dir))
            .with_options(EngineOptions {
                mirror_all_versions: config.mirror_all_versions,
                batch_size: config.batch_size,
                icon_theme: config.icon_theme.clone(),
            })
            .with_cancellation(cancel.clone());

        Ok(Self {
            config,
            builds,
            transport,
            client,
            engine,
            cancel,
        })
    }

    /// Returns the token that cancels this session.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the session config.
    #[must_use]
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Runs the full mirror pipeline.
    ///
    /// Per-release failures are reported, not returned as errors.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AllManifestsFailed`] if no build listing was fetched
    /// - [`SessionError::Prepare`] if the output tree cannot be created
    /// - [`SessionError::Manifest`] if the output manifest cannot be written
    #[instrument(skip(self), fields(builds = self.builds.len(), output = %self.config.output_dir.display()))]
    pub async fn mirror(&self) -> Result<MirrorReport, SessionError> {
        self.transport.stats().reset();
        let (listings, failed_builds) = self.fetch_listings().await;
        if listings.is_empty() {
            return Err(SessionError::AllManifestsFailed {
                builds: self.builds.len(),
                failures: failed_builds,
            });
        }

        let fetched_builds: Vec<String> = listings.iter().map(|(build, _)| build.clone()).collect();
        let merged = merge_repositories(listings.into_iter().map(|(_, repository)| repository));
        let estimated_bytes = merged.total_size();
        info!(
            plugins = merged.plugin_count(),
            categories = merged.categories().len(),
            estimated = %HumanBytes(estimated_bytes),
            "merged listing ready"
        );

        self.engine
            .layout()
            .prepare(&merged)
            .await
            .map_err(SessionError::Prepare)?;

        let outcomes = self.engine.run(&merged).await;
        let manifest_path = self.engine.finalize(&outcomes).await?;

        let stats = self.engine.stats();
        let transport_stats = self.transport.stats();
        let report = MirrorReport {
            builds: fetched_builds,
            failed_builds,
            estimated_bytes,
            downloaded: stats.downloaded(),
            skipped: stats.skipped(),
            failed: stats.failed(),
            bytes_downloaded: stats.bytes_downloaded(),
            icons_downloaded: stats.icons_downloaded(),
            icons_skipped: stats.icons_skipped(),
            icons_failed: stats.icons_failed(),
            requests: transport_stats.attempts(),
            retries: transport_stats.retries(),
            failures: outcomes.iter().filter_map(release_failure).collect(),
            manifest_path,
            cancelled: self.cancel.is_cancelled(),
        };
        info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "session complete"
        );
        Ok(report)
    }

    /// Fetches every build listing concurrently, keeping input order.
    async fn fetch_listings(&self) -> (Vec<(String, Repository)>, Vec<BuildFailure>) {
        let handles: Vec<_> = self
            .builds
            .iter()
            .map(|build| {
                let client = self.client.clone();
                let build = build.clone();
                tokio::spawn(async move {
                    let result = client.list_plugins(&build).await;
                    (build.to_string(), result)
                })
            })
            .collect();

        let mut listings = Vec::with_capacity(handles.len());
        let mut failures = Vec::new();
        for (handle, build) in handles.into_iter().zip(&self.builds) {
            match handle.await {
                Ok((build, Ok(repository))) => {
                    info!(
                        build = %build,
                        plugins = repository.plugin_count(),
                        "listing fetched"
                    );
                    listings.push((build, repository));
                }
                Ok((build, Err(e))) => {
                    warn!(build = %build, error = %e, "listing failed, skipping build");
                    failures.push(BuildFailure {
                        build,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(build = %build, error = %e, "listing task panicked");
                    failures.push(BuildFailure {
                        build: build.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        (listings, failures)
    }
}

fn release_failure(outcome: &DownloadOutcome) -> Option<ReleaseFailure> {
    let DownloadOutcome::Failure {
        release,
        kind,
        reason,
        cause,
    } = outcome
    else {
        return None;
    };
    Some(ReleaseFailure {
        id: release.plugin.id.clone(),
        name: release.plugin.name.clone(),
        version: release.plugin.version.clone(),
        category: release.category.clone(),
        kind: *kind,
        reason: reason.clone(),
        cause: cause.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::test_support::fake_transport::{FakeReply, FakeTransport};

    const BUILD_A: &str = "IC-241.1";
    const BUILD_B: &str = "IU-241.1";

    fn listing(plugins: &[(&str, &str, u64)]) -> String {
        let body: String = plugins
            .iter()
            .map(|(id, version, size)| {
                format!(
                    "<idea-plugin size=\"{size}\"><name>{id}</name><id>{id}</id><version>{version}</version></idea-plugin>"
                )
            })
            .collect();
        format!("<plugin-repository><category name=\"Tools\">{body}</category></plugin-repository>")
    }

    fn list_key(build: &str) -> String {
        format!("/plugins/list?build={build}")
    }

    fn download_key(id: &str, version: &str) -> String {
        format!("/plugin/download?pluginId={id}&version={version}")
    }

    fn session(fake: &Arc<FakeTransport>, root: &std::path::Path, builds: &[&str]) -> MirrorSession {
        let mut config =
            MirrorConfig::new(root, builds.iter().map(ToString::to_string).collect());
        config.rate_limit = 0;
        config.retry_base_delay = Duration::from_millis(1);
        config.request_timeout = Duration::from_millis(50);
        config.icon_theme = None;
        MirrorSession::with_transport(config, Arc::clone(fake) as Arc<dyn HttpTransport>).unwrap()
    }

    // ==================== Pipeline Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_mirror_downloads_and_writes_manifest() {
        let temp = TempDir::new().unwrap();
        let fake = Arc::new(FakeTransport::new());
        fake.push(&list_key(BUILD_A), FakeReply::bytes(200, listing(&[("demo", "1.0", 100)]).as_bytes()));
        fake.push(&download_key("demo", "1.0"), FakeReply::file("demo-1.0.zip", &[1u8; 100]));

        let report = session(&fake, temp.path(), &[BUILD_A]).mirror().await.unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.estimated_bytes, 100);
        assert_eq!(report.bytes_downloaded, 100);
        assert!(report.is_complete());
        assert_eq!(report.manifest_path, temp.path().join("plugins/repository.xml"));
        let manifest = std::fs::read_to_string(&report.manifest_path).unwrap();
        assert!(manifest.contains("<id>demo</id>"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_release_downloads_once() {
        let temp = TempDir::new().unwrap();
        let fake = Arc::new(FakeTransport::new());
        fake.push(&list_key(BUILD_A), FakeReply::bytes(200, listing(&[("demo", "1.0", 3)]).as_bytes()));
        fake.push(
            &list_key(BUILD_B),
            FakeReply::bytes(200, listing(&[("demo", "1.0", 3), ("extra", "2.0", 3)]).as_bytes()),
        );
        fake.push(&download_key("demo", "1.0"), FakeReply::file("demo.zip", b"abc"));
        fake.push(&download_key("extra", "2.0"), FakeReply::file("extra.zip", b"xyz"));

        let report = session(&fake, temp.path(), &[BUILD_A, BUILD_B]).mirror().await.unwrap();

        assert_eq!(report.builds, vec![BUILD_A.to_string(), BUILD_B.to_string()]);
        assert_eq!(report.downloaded, 2);
        assert_eq!(report.estimated_bytes, 6);
        assert_eq!(fake.calls(&download_key("demo", "1.0")), 1);
    }

    // ==================== Failure Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_failed_build_is_skipped() {
        let temp = TempDir::new().unwrap();
        let fake = Arc::new(FakeTransport::new());
        fake.push(&list_key(BUILD_A), FakeReply::bytes(404, b""));
        fake.push(&list_key(BUILD_B), FakeReply::bytes(200, listing(&[("demo", "1.0", 3)]).as_bytes()));
        fake.push(&download_key("demo", "1.0"), FakeReply::file("demo.zip", b"abc"));

        let report = session(&fake, temp.path(), &[BUILD_A, BUILD_B]).mirror().await.unwrap();

        assert_eq!(report.failed_builds.len(), 1);
        assert_eq!(report.failed_builds[0].build, BUILD_A);
        assert_eq!(report.downloaded, 1);
        assert!(!report.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_builds_failing_is_fatal() {
        let temp = TempDir::new().unwrap();
        let fake = Arc::new(FakeTransport::new());
        fake.push("/plugins/list", FakeReply::bytes(500, b""));

        let result = session(&fake, temp.path(), &[BUILD_A, BUILD_B]).mirror().await;

        match result {
            Err(SessionError::AllManifestsFailed { builds, failures }) => {
                assert_eq!(builds, 2);
                assert_eq!(failures.len(), 2);
            }
            other => panic!("expected AllManifestsFailed, got {other:?}"),
        }
        assert!(!temp.path().join("plugins").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_failures_are_reported() {
        let temp = TempDir::new().unwrap();
        let fake = Arc::new(FakeTransport::new());
        fake.push(
            &list_key(BUILD_A),
            FakeReply::bytes(200, listing(&[("good", "1.0", 3), ("gone", "1.0", 3)]).as_bytes()),
        );
        fake.push(&download_key("good", "1.0"), FakeReply::file("good.zip", b"abc"));
        fake.push(&download_key("gone", "1.0"), FakeReply::bytes(404, b""));

        let report = session(&fake, temp.path(), &[BUILD_A]).mirror().await.unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].id, "gone");
        assert_eq!(report.failures[0].kind, ErrorKind::Unknown);
        assert_eq!(report.failures[0].reason, "Not Found");

        let manifest = std::fs::read_to_string(&report.manifest_path).unwrap();
        let captured = Repository::from_xml(&manifest).unwrap();
        assert_eq!(captured.plugin_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_session_keeps_manifest() {
        let temp = TempDir::new().unwrap();
        let fake = Arc::new(FakeTransport::new());
        fake.push(&list_key(BUILD_A), FakeReply::bytes(200, listing(&[("demo", "1.0", 3)]).as_bytes()));
        fake.push(&download_key("demo", "1.0"), FakeReply::Hang);

        let session = session(&fake, temp.path(), &[BUILD_A]);
        let cancel = session.cancellation_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });
        let report = session.mirror().await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.failures[0].kind, ErrorKind::Cancelled);
        assert!(report.manifest_path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_keeps_completed_releases() {
        let temp = TempDir::new().unwrap();
        let fake = Arc::new(FakeTransport::new());
        fake.push(
            &list_key(BUILD_A),
            FakeReply::bytes(200, listing(&[("done", "1.0", 3), ("stuck", "1.0", 3)]).as_bytes()),
        );
        fake.push(&download_key("done", "1.0"), FakeReply::file("done.zip", b"abc"));
        fake.push(&download_key("stuck", "1.0"), FakeReply::Hang);

        let session = session(&fake, temp.path(), &[BUILD_A]);
        let cancel = session.cancellation_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });
        let report = session.mirror().await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.downloaded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].id, "stuck");
        assert_eq!(report.failures[0].kind, ErrorKind::Cancelled);
        assert!(temp.path().join("plugins/tools/done/1.0/done.zip").is_file());

        let manifest = std::fs::read_to_string(&report.manifest_path).unwrap();
        let captured = Repository::from_xml(&manifest).unwrap();
        assert_eq!(captured.plugin_count(), 1);
        assert_eq!(captured.category("Tools").unwrap().plugins[0].id, "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_mirror_reports_per_run_counts() {
        let temp = TempDir::new().unwrap();
        let fake = Arc::new(FakeTransport::new());
        fake.push(&list_key(BUILD_A), FakeReply::bytes(200, listing(&[("demo", "1.0", 3)]).as_bytes()));
        fake.push(&download_key("demo", "1.0"), FakeReply::file("demo.zip", b"abc"));

        let session = session(&fake, temp.path(), &[BUILD_A]);
        let first = session.mirror().await.unwrap();
        assert_eq!(first.downloaded, 1);
        // listing, default icon, artifact
        assert_eq!(first.requests, 3);

        let second = session.mirror().await.unwrap();
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.bytes_downloaded, 0);
        assert_eq!(second.requests, 2);
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_invalid_config_rejected() {
        let fake = Arc::new(FakeTransport::new());
        let config = MirrorConfig::new("/mirror", Vec::new());
        let result = MirrorSession::with_transport(config, fake as Arc<dyn HttpTransport>);
        assert!(matches!(result, Err(SessionError::Config(ConfigError::NoBuilds))));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = MirrorReport {
            builds: vec![BUILD_A.to_string()],
            failed_builds: Vec::new(),
            estimated_bytes: 10,
            downloaded: 1,
            skipped: 0,
            failed: 1,
            bytes_downloaded: 10,
            icons_downloaded: 0,
            icons_skipped: 0,
            icons_failed: 0,
            requests: 2,
            retries: 0,
            failures: vec![ReleaseFailure {
                id: "demo".to_string(),
                name: "Demo".to_string(),
                version: "1.0".to_string(),
                category: "Tools".to_string(),
                kind: ErrorKind::Timeout,
                reason: "timed out".to_string(),
                cause: None,
            }],
            manifest_path: PathBuf::from("/mirror/plugins/repository.xml"),
            cancelled: false,
        };

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failures"][0]["kind"], "timeout");
        assert!(json["failures"][0].get("cause").is_none());
        assert_eq!(json["estimated_bytes"], 10);
    }
}
