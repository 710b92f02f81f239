//! Download orchestrator: turns a merged repository into files on disk.
//!
//! Each release runs a small state machine that ends in `Skipped`,
//! `Downloaded`, or `Failed`:
//!
//! 1. best-effort icon fetches (default theme, then the alternate theme)
//! 2. existence check against the declared size, with no network call
//! 3. artifact request; non-2xx or a nameless response fails the release
//! 4. an existing file of the wrong size is deleted, a right-sized one skips
//! 5. body streamed to a scratch file, then renamed over the target
//!
//! Releases run as concurrent Tokio tasks. Outcomes are logged and counted
//! as each task is joined; per-release failures never abort the run.

mod error_mapping;
mod staging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::HumanBytes;
use tokio::fs;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::layout::find_existing_file;
use super::{
    DownloadAction, DownloadOutcome, ErrorKind, FetchError, MirrorLayout, MirrorStats, Release,
    manifest,
};
use crate::client::{ArtifactResponse, PluginRepositoryClient};
use crate::model::{ManifestError, Plugin, Repository};

use error_mapping::{classify_fetch_error, failure_cause, failure_reason};

/// Default number of releases processed together in all-versions mode.
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Alternate icon theme fetched next to the default icon.
pub const DEFAULT_ICON_THEME: &str = "DARCULA";

/// Knobs for a mirror run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Expand every listed plugin into its full release history.
    pub mirror_all_versions: bool,

    /// Releases per batch in all-versions mode (at least 1).
    pub batch_size: usize,

    /// Named icon theme fetched after the default icon, if any.
    pub icon_theme: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mirror_all_versions: false,
            batch_size: DEFAULT_BATCH_SIZE,
            icon_theme: Some(DEFAULT_ICON_THEME.to_string()),
        }
    }
}

/// A scheduled release and whether its task also fetches the plugin's icons.
type ScheduledRelease = (Arc<Release>, bool);

/// Concurrent, idempotent download orchestrator.
///
/// Cheap to clone; clones share counters and the cancellation token.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use plugin_mirror::client::PluginRepositoryClient;
/// use plugin_mirror::mirror::{MirrorEngine, MirrorLayout};
/// use plugin_mirror::model::Repository;
/// use plugin_mirror::transport::{ReqwestTransport, ResilientTransport};
///
/// # async fn example(repository: Repository) -> Result<(), Box<dyn std::error::Error>> {
/// let backend = Arc::new(ReqwestTransport::new("plugin-mirror/0.1")?);
/// let client = PluginRepositoryClient::new(Arc::new(ResilientTransport::new(backend)));
/// let engine = MirrorEngine::new(client, MirrorLayout::new("./mirror"));
///
/// let outcomes = engine.run(&repository).await;
/// engine.finalize(&outcomes).await?;
/// println!("downloaded {}", engine.stats().downloaded());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MirrorEngine {
    client: PluginRepositoryClient,
    layout: MirrorLayout,
    options: EngineOptions,
    cancel: CancellationToken,
    stats: Arc<MirrorStats>,
}

impl MirrorEngine {
    /// Creates an engine with default options.
    #[must_use]
    pub fn new(client: PluginRepositoryClient, layout: MirrorLayout) -> Self {
        Self {
            client,
            layout,
            options: EngineOptions::default(),
            cancel: CancellationToken::new(),
            stats: Arc::new(MirrorStats::new()),
        }
    }

    /// Replaces the run options.
    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = EngineOptions {
            batch_size: options.batch_size.max(1),
            ..options
        };
        self
    }

    /// Uses `cancel` as the session cancellation signal.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the run options.
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Returns the output layout.
    #[must_use]
    pub fn layout(&self) -> &MirrorLayout {
        &self.layout
    }

    /// Returns the running counters.
    #[must_use]
    pub fn stats(&self) -> &MirrorStats {
        &self.stats
    }

    /// Mirrors every release in `repository`, returning one outcome per release.
    ///
    /// Outcomes are in scheduling order. Cancellation turns releases still in
    /// flight into `Cancelled` failures; outcomes already produced are kept.
    /// Counters in [`Self::stats`] cover this run only.
    #[instrument(skip_all, fields(
        plugins = repository.plugin_count(),
        all_versions = self.options.mirror_all_versions
    ))]
    pub async fn run(&self, repository: &Repository) -> Vec<DownloadOutcome> {
        self.stats.reset();
        let outcomes = if self.options.mirror_all_versions {
            let releases = self.expand_versions(repository).await;
            self.run_batched(releases).await
        } else {
            self.run_by_category(repository).await
        };

        info!(
            downloaded = self.stats.downloaded(),
            skipped = self.stats.skipped(),
            failed = self.stats.failed(),
            bytes = %HumanBytes(self.stats.bytes_downloaded()),
            icons_downloaded = self.stats.icons_downloaded(),
            icons_failed = self.stats.icons_failed(),
            "mirror run complete"
        );
        outcomes
    }

    /// Writes the manifest of successfully mirrored releases.
    ///
    /// Returns the manifest path.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] if the manifest cannot be encoded or written.
    pub async fn finalize(
        &self,
        outcomes: &[DownloadOutcome],
    ) -> Result<PathBuf, ManifestError> {
        let captured = manifest::captured_repository(outcomes);
        let path = self.layout.manifest_path();
        manifest::write_manifest(&path, &captured).await?;
        info!(
            path = %path.display(),
            plugins = captured.plugin_count(),
            "manifest written"
        );
        Ok(path)
    }

    /// Runs the state machine for one release.
    ///
    /// When `with_icons` is set, the plugin's icons are fetched first; their
    /// outcomes are counted separately and never affect the returned outcome.
    #[instrument(skip_all, fields(plugin = %release.plugin.id, version = %release.plugin.version))]
    pub async fn mirror_release(&self, release: Arc<Release>, with_icons: bool) -> DownloadOutcome {
        if with_icons {
            self.mirror_icons(&release).await;
        }

        match self.download_release(&release).await {
            Ok(action) => DownloadOutcome::success(release, action),
            Err(error) => outcome_from_error(release, &error),
        }
    }

    /// Every category is spawned before any release is joined.
    async fn run_by_category(&self, repository: &Repository) -> Vec<DownloadOutcome> {
        let mut scheduled = Vec::with_capacity(repository.plugin_count());

        for category in repository.categories() {
            debug!(
                category = %category.name,
                plugins = category.plugins.len(),
                "mirroring category"
            );
            scheduled.extend(
                category
                    .plugins
                    .iter()
                    .map(|plugin| (Arc::new(Release::new(&category.name, plugin.clone())), true)),
            );
        }

        self.spawn_and_join(scheduled).await
    }

    async fn run_batched(&self, releases: Vec<ScheduledRelease>) -> Vec<DownloadOutcome> {
        let total = releases.len();
        let mut outcomes = Vec::with_capacity(total);

        let mut remaining = releases.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<ScheduledRelease> =
                remaining.by_ref().take(self.options.batch_size).collect();
            outcomes.extend(self.spawn_and_join(batch).await);
            info!(processed = outcomes.len(), total, "batch complete");
        }

        outcomes
    }

    /// Replaces each listed plugin with its full release history.
    ///
    /// A plugin whose history cannot be listed is skipped for this run.
    async fn expand_versions(&self, repository: &Repository) -> Vec<ScheduledRelease> {
        let mut lookups = Vec::with_capacity(repository.plugin_count());
        for (category, plugin) in repository.plugins() {
            let client = self.client.clone();
            let category = category.name.clone();
            let listed = plugin.clone();
            lookups.push(tokio::spawn(async move {
                let history = client.list_versions(&listed.id).await;
                (category, listed, history)
            }));
        }

        let mut releases = Vec::new();
        for lookup in lookups {
            let (category, listed, history) = match lookup.await {
                Ok(joined) => joined,
                Err(e) => {
                    warn!(error = %e, "release listing task panicked");
                    continue;
                }
            };

            match history {
                Ok(history) if history.is_empty() => {
                    debug!(plugin = %listed.id, "no releases listed");
                }
                Ok(history) => {
                    debug!(plugin = %listed.id, releases = history.len(), "expanded release history");
                    for (index, plugin) in history.into_iter().enumerate() {
                        releases.push((Arc::new(Release::new(&category, plugin)), index == 0));
                    }
                }
                Err(e) => {
                    warn!(
                        plugin = %listed.id,
                        timeout = e.is_timeout(),
                        error = %e,
                        "failed to list releases, skipping plugin for this run"
                    );
                }
            }
        }

        info!(releases = releases.len(), "release history expanded");
        releases
    }

    async fn spawn_and_join(&self, scheduled: Vec<ScheduledRelease>) -> Vec<DownloadOutcome> {
        let mut handles: Vec<(Arc<Release>, JoinHandle<DownloadOutcome>)> =
            Vec::with_capacity(scheduled.len());

        for (release, with_icons) in scheduled {
            let engine = self.clone();
            let task_release = Arc::clone(&release);
            handles.push((
                release,
                tokio::spawn(async move { engine.mirror_release(task_release, with_icons).await }),
            ));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (release, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "download task panicked");
                    DownloadOutcome::failure(
                        release,
                        ErrorKind::Exception,
                        "download task panicked",
                        Some(e.to_string()),
                    )
                }
            };
            self.report(&outcome);
            outcomes.push(outcome);
        }
        outcomes
    }

    fn report(&self, outcome: &DownloadOutcome) {
        self.stats.record(outcome);
        let plugin = outcome.plugin();
        match outcome {
            DownloadOutcome::Success {
                action: DownloadAction::Downloaded,
                ..
            } => info!(
                plugin = %plugin.name,
                version = %plugin.version,
                size = %HumanBytes(plugin.size),
                "downloaded"
            ),
            DownloadOutcome::Success {
                action: DownloadAction::Skipped,
                ..
            } => debug!(plugin = %plugin.name, version = %plugin.version, "skipped, already present"),
            DownloadOutcome::Failure {
                kind,
                reason,
                cause,
                ..
            } => warn!(
                plugin = %plugin.name,
                version = %plugin.version,
                kind = %kind,
                reason = %reason,
                cause = cause.as_deref().unwrap_or(""),
                "download failed"
            ),
        }
    }

    async fn mirror_icons(&self, release: &Arc<Release>) {
        let themes = [None, self.options.icon_theme.as_deref()];
        for (index, theme) in themes.into_iter().enumerate() {
            if index > 0 && theme.is_none() {
                continue;
            }
            let outcome = match self.download_icon(&release.plugin, theme).await {
                Ok(action) => DownloadOutcome::success(Arc::clone(release), action),
                Err(error) => outcome_from_error(Arc::clone(release), &error),
            };
            if let DownloadOutcome::Failure { kind, reason, .. } = &outcome {
                debug!(
                    plugin = %release.plugin.id,
                    theme = theme.unwrap_or("default"),
                    kind = %kind,
                    reason = %reason,
                    "icon not mirrored"
                );
            }
            self.stats.record_icon(&outcome);
        }
    }

    async fn download_icon(
        &self,
        plugin: &Plugin,
        theme: Option<&str>,
    ) -> Result<DownloadAction, FetchError> {
        let dir = self.layout.icon_dir(plugin, theme);
        if find_existing_file(&dir, |len| len > 0).await.is_some() {
            return Ok(DownloadAction::Skipped);
        }

        let response = self
            .client
            .download_icon(&plugin.id, theme)
            .await
            .map_err(FetchError::client)?;
        let expected = response.content_length;
        self.place_artifact(response, &dir, expected).await
    }

    async fn download_release(&self, release: &Release) -> Result<DownloadAction, FetchError> {
        let plugin = &release.plugin;
        let dir = self.layout.release_dir(&release.category, plugin);
        if let Some(existing) = find_existing_file(&dir, |len| len == plugin.size).await {
            debug!(path = %existing.display(), "artifact already present");
            return Ok(DownloadAction::Skipped);
        }

        let response = self
            .client
            .download_artifact(&plugin.id, &plugin.version)
            .await
            .map_err(FetchError::client)?;
        let expected = Some(response.content_length.unwrap_or(plugin.size));
        self.place_artifact(response, &dir, expected).await
    }

    /// Checks the response, clears a stale file, and stages the body into `dir`.
    async fn place_artifact(
        &self,
        response: ArtifactResponse,
        dir: &Path,
        expected_len: Option<u64>,
    ) -> Result<DownloadAction, FetchError> {
        if !response.is_success() {
            return Err(FetchError::status(response.status, response.reason.clone()));
        }
        let filename = response
            .require_filename()
            .map_err(FetchError::client)?
            .to_string();
        let target = dir.join(&filename);

        if let Ok(metadata) = fs::metadata(&target).await {
            if expected_len == Some(metadata.len()) {
                debug!(path = %target.display(), "artifact already present under served name");
                return Ok(DownloadAction::Skipped);
            }
            debug!(
                path = %target.display(),
                found = metadata.len(),
                expected = expected_len,
                "removing mis-sized artifact"
            );
            fs::remove_file(&target)
                .await
                .map_err(|e| FetchError::io(&target, e))?;
        }

        fs::create_dir_all(dir)
            .await
            .map_err(|e| FetchError::io(dir, e))?;
        let scratch_dir = self.layout.scratch_dir();
        fs::create_dir_all(&scratch_dir)
            .await
            .map_err(|e| FetchError::io(&scratch_dir, e))?;

        let scratch = self.layout.scratch_file();
        let written = staging::stage_and_place(response, &scratch, &target, &self.cancel).await?;
        self.stats.add_bytes(written);
        debug!(path = %target.display(), bytes = written, "artifact placed");
        Ok(DownloadAction::Downloaded)
    }
}

fn outcome_from_error(release: Arc<Release>, error: &FetchError) -> DownloadOutcome {
    DownloadOutcome::failure(
        release,
        classify_fetch_error(error),
        failure_reason(error),
        failure_cause(error),
    )
}
