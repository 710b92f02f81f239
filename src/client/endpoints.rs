//! URL construction for the repository's HTTP API.

use std::sync::LazyLock;

use url::Url;

use super::ClientError;

/// Public JetBrains plugin repository.
pub const DEFAULT_BASE_URL: &str = "https://plugins.jetbrains.com";

const LIST_PATH: &str = "plugins/list";
const DOWNLOAD_PATH: &str = "plugin/download";
const PLUGIN_MANAGER_PATH: &str = "pluginManager";
const ICON_PATH: &str = "api/icon";

#[allow(clippy::expect_used)]
static DEFAULT_BASE: LazyLock<Url> = LazyLock::new(|| {
    Url::parse(&format!("{DEFAULT_BASE_URL}/")).expect("default base URL is valid") // Static URL, safe to panic
});

/// Builds request URLs relative to a repository base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Creates endpoints rooted at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] when `base` is not an absolute
    /// http(s) URL.
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(base).map_err(|_| ClientError::invalid_base_url(base))?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(ClientError::invalid_base_url(base.as_str()));
        }
        // endpoint paths are appended to the base path
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `plugins/list?build=<build>`
    #[must_use]
    pub fn list_for_build(&self, build: &str) -> Url {
        self.with_query(LIST_PATH, &[("build", build)])
    }

    /// `plugins/list?pluginId=<id>`
    #[must_use]
    pub fn list_for_plugin(&self, plugin_id: &str) -> Url {
        self.with_query(LIST_PATH, &[("pluginId", plugin_id)])
    }

    /// `plugin/download?pluginId=<id>&version=<version>`
    #[must_use]
    pub fn download(&self, plugin_id: &str, version: &str) -> Url {
        self.with_query(DOWNLOAD_PATH, &[("pluginId", plugin_id), ("version", version)])
    }

    /// `pluginManager?action=download&id=<id>&build=<build>`
    #[must_use]
    pub fn download_latest(&self, plugin_id: &str, build: &str) -> Url {
        self.with_query(
            PLUGIN_MANAGER_PATH,
            &[("action", "download"), ("id", plugin_id), ("build", build)],
        )
    }

    /// `api/icon?pluginId=<id>[&theme=<THEME>]`
    #[must_use]
    pub fn icon(&self, plugin_id: &str, theme: Option<&str>) -> Url {
        match theme {
            Some(theme) => {
                let theme = theme.to_uppercase();
                self.with_query(ICON_PATH, &[("pluginId", plugin_id), ("theme", &theme)])
            }
            None => self.with_query(ICON_PATH, &[("pluginId", plugin_id)]),
        }
    }

    fn with_query(&self, path: &str, pairs: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("{}{path}", self.base.path()));
        url.query_pairs_mut().clear().extend_pairs(pairs);
        url
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE.clone(),
        }
    }
}
