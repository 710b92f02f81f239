//! The output manifest: what a run actually captured.

use std::path::Path;

use tokio::fs;
use tracing::{debug, instrument};

use super::DownloadOutcome;
use crate::model::{ManifestError, Repository};

/// Builds a repository holding every successfully mirrored release, grouped
/// by the category it was listed under.
#[must_use]
pub fn captured_repository(outcomes: &[DownloadOutcome]) -> Repository {
    let mut repository = Repository::new();
    for outcome in outcomes.iter().filter(|o| o.is_success()) {
        let release = outcome.release();
        repository.push_plugin(&release.category, release.plugin.clone());
    }
    repository
}

/// Writes `repository` to `path`, replacing any previous manifest.
///
/// The document is staged next to `path` and renamed over it, so readers see
/// either the old manifest or the new one.
///
/// # Errors
///
/// Returns [`ManifestError::Encode`] if serialization fails, or
/// [`ManifestError::Io`] if the file cannot be written.
#[instrument(skip(repository), fields(path = %path.display(), plugins = repository.plugin_count()))]
pub async fn write_manifest(path: &Path, repository: &Repository) -> Result<(), ManifestError> {
    let xml = repository.to_xml()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ManifestError::io(parent, e))?;
    }

    let staged = path.with_extension("xml.tmp");
    if let Err(e) = fs::write(&staged, xml.as_bytes()).await {
        let _ = fs::remove_file(&staged).await;
        return Err(ManifestError::io(&staged, e));
    }
    if let Err(e) = fs::rename(&staged, path).await {
        let _ = fs::remove_file(&staged).await;
        return Err(ManifestError::io(path, e));
    }

    debug!(bytes = xml.len(), "manifest written");
    Ok(())
}
