//! Typed access to a plugin repository's listing and download endpoints.
//!
//! [`PluginRepositoryClient`] sits on top of any [`HttpTransport`]; in a
//! mirror session that is a [`crate::transport::ResilientTransport`], so every
//! call here is already rate limited, retried, and redirect-resolved.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use plugin_mirror::client::PluginRepositoryClient;
//! use plugin_mirror::transport::{ReqwestTransport, ResilientTransport};
//! use plugin_mirror::version::BuildVersion;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(ReqwestTransport::new("plugin-mirror/0.1")?);
//! let client = PluginRepositoryClient::new(Arc::new(ResilientTransport::new(backend)));
//!
//! let repository = client.list_plugins(&BuildVersion::parse("IC-241.14494")?).await?;
//! println!("{} plugins", repository.plugin_count());
//! # Ok(())
//! # }
//! ```

mod endpoints;
mod error;
pub mod filename;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};
use url::Url;

use crate::model::{Plugin, Repository};
use crate::transport::{BodyStream, HttpResponse, HttpTransport, TransportError};
use crate::version::BuildVersion;

pub use endpoints::{DEFAULT_BASE_URL, Endpoints};
pub use error::ClientError;

/// A download response: status, the metadata the mirror needs, and the body.
pub struct ArtifactResponse {
    /// HTTP status of the final (post-redirect) response.
    pub status: u16,

    /// Reason phrase for `status`.
    pub reason: String,

    /// URL the body is served from.
    pub url: Url,

    /// Sanitized filename from `Content-Disposition` or the URL path.
    pub filename: Option<String>,

    /// Declared body length.
    pub content_length: Option<u64>,

    /// Body chunks.
    pub body: BodyStream,
}

impl ArtifactResponse {
    fn from_http(response: HttpResponse) -> Self {
        let reason = response.reason_phrase();
        let filename =
            filename::resolve_filename(response.content_disposition.as_deref(), &response.url);
        Self {
            status: response.status,
            reason,
            url: response.url,
            filename,
            content_length: response.content_length,
            body: response.body,
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the filename or the "missing file information" error.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingFileInformation`] when neither the
    /// headers nor the URL named the file.
    pub fn require_filename(&self) -> Result<&str, ClientError> {
        self.filename
            .as_deref()
            .ok_or_else(|| ClientError::missing_file_information(self.url.as_str()))
    }
}

impl fmt::Debug for ArtifactResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("url", &self.url.as_str())
            .field("filename", &self.filename)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Client for the plugin repository HTTP API.
#[derive(Clone)]
pub struct PluginRepositoryClient {
    transport: Arc<dyn HttpTransport>,
    endpoints: Endpoints,
}

impl PluginRepositoryClient {
    /// Creates a client for the public JetBrains repository.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_endpoints(transport, Endpoints::default())
    }

    /// Creates a client for a repository at a custom location.
    #[must_use]
    pub fn with_endpoints(transport: Arc<dyn HttpTransport>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Returns the endpoint builder in use.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fetches every plugin compatible with `build`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transport`] if the request fails or returns non-2xx
    /// - [`ClientError::Manifest`] if the body is not a `plugin-repository` document
    #[instrument(skip(self), fields(build = %build))]
    pub async fn list_plugins(&self, build: &BuildVersion) -> Result<Repository, ClientError> {
        let url = self.endpoints.list_for_build(&build.to_string());
        let repository = self.fetch_listing(&url).await?;
        debug!(
            categories = repository.categories().len(),
            plugins = repository.plugin_count(),
            "listing received"
        );
        Ok(repository)
    }

    /// Fetches every published release of `plugin_id`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::list_plugins`].
    #[instrument(skip(self))]
    pub async fn list_versions(&self, plugin_id: &str) -> Result<Vec<Plugin>, ClientError> {
        let url = self.endpoints.list_for_plugin(plugin_id);
        let releases: Vec<Plugin> = self
            .fetch_listing(&url)
            .await?
            .into_categories()
            .into_iter()
            .flat_map(|category| category.plugins)
            .collect();
        debug!(releases = releases.len(), "release history received");
        Ok(releases)
    }

    /// Requests the binary for one release.
    ///
    /// A non-2xx final status is returned as-is, not as an error, so the
    /// caller can report the server's reason.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if no response could be obtained.
    #[instrument(skip(self))]
    pub async fn download_artifact(
        &self,
        plugin_id: &str,
        version: &str,
    ) -> Result<ArtifactResponse, ClientError> {
        self.fetch_artifact(&self.endpoints.download(plugin_id, version))
            .await
    }

    /// Requests the newest release of `plugin_id` compatible with `build`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if no response could be obtained.
    #[instrument(skip(self), fields(build = %build))]
    pub async fn download_latest(
        &self,
        plugin_id: &str,
        build: &BuildVersion,
    ) -> Result<ArtifactResponse, ClientError> {
        self.fetch_artifact(&self.endpoints.download_latest(plugin_id, &build.to_string()))
            .await
    }

    /// Requests a plugin icon, optionally for a named theme.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if no response could be obtained.
    #[instrument(skip(self))]
    pub async fn download_icon(
        &self,
        plugin_id: &str,
        theme: Option<&str>,
    ) -> Result<ArtifactResponse, ClientError> {
        self.fetch_artifact(&self.endpoints.icon(plugin_id, theme))
            .await
    }

    async fn fetch_listing(&self, url: &Url) -> Result<Repository, ClientError> {
        let response = self.transport.get(url).await.map_err(ClientError::transport)?;
        if !response.is_success() {
            return Err(ClientError::transport(TransportError::http_status(
                url.as_str(),
                response.status,
                Some(response.reason_phrase()),
            )));
        }

        let body = response.text().await.map_err(ClientError::transport)?;
        Repository::from_xml(&body).map_err(|e| ClientError::manifest(url.as_str(), e))
    }

    async fn fetch_artifact(&self, url: &Url) -> Result<ArtifactResponse, ClientError> {
        let response = self.transport.get(url).await.map_err(ClientError::transport)?;
        let artifact = ArtifactResponse::from_http(response);
        debug!(
            status = artifact.status,
            filename = artifact.filename.as_deref().unwrap_or("<none>"),
            content_length = artifact.content_length,
            "artifact response"
        );
        Ok(artifact)
    }
}

impl fmt::Debug for PluginRepositoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRepositoryClient")
            .field("base", &self.endpoints.base().as_str())
            .finish_non_exhaustive()
    }
}
