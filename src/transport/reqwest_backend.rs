//! [`HttpTransport`] backed by a pooled `reqwest` client.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap, HeaderName, LOCATION};
use reqwest::redirect::Policy;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::{HttpResponse, HttpTransport, TransportError};

/// HTTP backend using `reqwest` with automatic redirects disabled.
///
/// This client is designed to be created once per session and shared,
/// taking advantage of connection pooling.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    total_timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a backend with default connect and whole-request timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the TLS backend or system
    /// configuration cannot be initialised.
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        Self::with_timeouts(
            user_agent,
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(READ_TIMEOUT_SECS),
        )
    }

    /// Creates a backend with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the client cannot be built.
    #[instrument(level = "debug", skip(user_agent))]
    pub fn with_timeouts(
        user_agent: &str,
        connect_timeout: Duration,
        total_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(total_timeout)
            .gzip(true)
            .redirect(Policy::none())
            .user_agent(user_agent)
            .build()
            .map_err(TransportError::client_build)?;
        debug!("HTTP backend ready");
        Ok(Self {
            client,
            total_timeout,
        })
    }

    /// Returns the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let timeout = self.total_timeout;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_reqwest_error(url.as_str(), timeout, e))?;

        let status = response.status().as_u16();
        let location = header_string(response.headers(), &LOCATION);
        let content_disposition = header_string(response.headers(), &CONTENT_DISPOSITION);
        let content_length = response.content_length();
        let final_url = response.url().clone();

        let body_url = url.to_string();
        let body = response.bytes_stream().map(move |chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| map_reqwest_error(&body_url, timeout, e))
        });

        Ok(HttpResponse {
            status,
            reason: None,
            url: final_url,
            location,
            content_disposition,
            content_length,
            body: Box::pin(body),
        })
    }
}

fn map_reqwest_error(url: &str, timeout: Duration, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::timeout(url, timeout)
    } else {
        TransportError::network(url, error)
    }
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(std::string::ToString::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    const TEST_UA: &str = "plugin-mirror-test/0.0";

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new(TEST_UA).unwrap()
    }

    #[tokio::test]
    async fn test_get_returns_status_headers_and_body() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/plugin/download"))
            .and(query_param("pluginId", "demo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Disposition", r#"attachment; filename="demo-1.0.zip""#)
                    .set_body_bytes(vec![7u8; 100]),
            )
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/plugin/download?pluginId=demo", mock_server.uri())).unwrap();
        let response = transport().get(&url).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(
            response.content_disposition.as_deref(),
            Some(r#"attachment; filename="demo-1.0.zip""#)
        );
        assert_eq!(response.content_length, Some(100));
        assert_eq!(response.bytes().await.unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_get_does_not_follow_redirects() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/moved"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/files/demo.zip"))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/moved", mock_server.uri())).unwrap();
        let response = transport().get(&url).await.unwrap();

        assert_eq!(response.status, 302);
        assert!(response.is_redirect());
        assert_eq!(response.location.as_deref(), Some("/files/demo.zip"));
    }

    #[tokio::test]
    async fn test_get_reports_error_status_without_failing() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/missing", mock_server.uri())).unwrap();
        let response = transport().get(&url).await.unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.reason_phrase(), "Not Found");
    }

    #[tokio::test]
    async fn test_get_sends_user_agent() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(header("user-agent", TEST_UA))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = Url::parse(&mock_server.uri()).unwrap();
        let response = transport().get(&url).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_get_slow_server_maps_to_timeout() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::with_timeouts(
            TEST_UA,
            Duration::from_secs(1),
            Duration::from_millis(200),
        )
        .unwrap();
        let url = Url::parse(&mock_server.uri()).unwrap();
        let result = transport.get(&url).await;

        assert!(
            matches!(result, Err(TransportError::Timeout { .. })),
            "Expected Timeout, got: {result:?}"
        );
    }
}
