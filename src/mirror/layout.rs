//! On-disk layout of a mirror.
//!
//! ```text
//! <root>/
//!   plugins/
//!     repository.xml
//!     <category-slug>/<plugin-slug>/<version>/<file>
//!   icons/
//!     <plugin-slug>/[<theme-slug>/]<file>
//!   .mirror-tmp/
//! ```

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::client::filename::sanitize_filename;
use crate::model::{Plugin, Repository};
use crate::slug::slugify;

const PLUGINS_DIR: &str = "plugins";
const ICONS_DIR: &str = "icons";
const SCRATCH_DIR: &str = ".mirror-tmp";
const MANIFEST_FILE: &str = "repository.xml";
const SCRATCH_EXTENSION: &str = "part";

/// Maps releases and icons to paths under an output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorLayout {
    root: PathBuf,
}

impl MirrorLayout {
    /// Creates a layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The output root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/plugins/<category-slug>`
    #[must_use]
    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.root.join(PLUGINS_DIR).join(slugify(category))
    }

    /// `<root>/plugins/<category-slug>/<plugin-slug>/<version>`
    #[must_use]
    pub fn release_dir(&self, category: &str, plugin: &Plugin) -> PathBuf {
        self.category_dir(category)
            .join(slugify(&plugin.name))
            .join(sanitize_filename(&plugin.version))
    }

    /// `<root>/icons/<plugin-slug>[/<theme-slug>]`
    #[must_use]
    pub fn icon_dir(&self, plugin: &Plugin, theme: Option<&str>) -> PathBuf {
        let dir = self.root.join(ICONS_DIR).join(slugify(&plugin.name));
        match theme {
            Some(theme) => dir.join(slugify(theme)),
            None => dir,
        }
    }

    /// `<root>/plugins/repository.xml`
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(PLUGINS_DIR).join(MANIFEST_FILE)
    }

    /// Staging directory for partial downloads.
    ///
    /// Lives under the root so a staged file can be renamed into place.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(SCRATCH_DIR)
    }

    /// A fresh, unique staging path.
    #[must_use]
    pub fn scratch_file(&self) -> PathBuf {
        self.scratch_dir()
            .join(format!("{:016x}.{SCRATCH_EXTENSION}", rand::random::<u64>()))
    }

    /// Creates the scratch directory and one directory per category.
    ///
    /// Staged files left behind by an interrupted earlier run are removed.
    ///
    /// # Errors
    ///
    /// Returns the first IO error, annotated with the directory it concerns.
    pub async fn prepare(&self, repository: &Repository) -> std::io::Result<()> {
        let mut dirs = vec![self.root.join(PLUGINS_DIR), self.scratch_dir()];
        dirs.extend(
            repository
                .categories()
                .iter()
                .map(|category| self.category_dir(&category.name)),
        );
        for dir in dirs {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| std::io::Error::new(e.kind(), format!("{}: {e}", dir.display())))?;
        }
        let swept = self.sweep_scratch().await;
        debug!(root = %self.root.display(), swept, "output directories ready");
        Ok(())
    }

    /// Deletes stale `*.part` files from the scratch directory.
    ///
    /// Returns how many were removed. Files that cannot be removed are logged
    /// and left in place.
    async fn sweep_scratch(&self) -> usize {
        let dir = self.scratch_dir();
        let Ok(mut entries) = fs::read_dir(&dir).await else {
            return 0;
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != SCRATCH_EXTENSION) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove stale scratch file"),
            }
        }
        if removed > 0 {
            debug!(removed, "removed stale scratch files");
        }
        removed
    }
}

/// Returns the first regular file in `dir` whose length satisfies `accept`.
///
/// A missing or unreadable directory yields `None`.
pub(crate) async fn find_existing_file(
    dir: &Path,
    accept: impl Fn(u64) -> bool,
) -> Option<PathBuf> {
    let mut entries = fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if metadata.is_file() && accept(metadata.len()) {
            return Some(entry.path());
        }
    }
    None
}
