//! The abstract HTTP capability the mirror is built on.
//!
//! [`HttpTransport`] issues a single GET and hands back status, the few
//! headers the mirror cares about, and a streaming body. It does not follow
//! redirects; [`super::ResilientTransport`] does that above the retry layer.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt, stream};
use reqwest::StatusCode;
use url::Url;

use super::TransportError;

/// Streaming response body.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// A single-request HTTP GET capability.
///
/// Implementations must not follow redirects themselves.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues a GET for `url` and returns once response headers are available.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response could be obtained.
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError>;
}

/// Response head plus streaming body.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,

    /// Reason phrase sent by the server, when the backend exposes one.
    pub reason: Option<String>,

    /// URL this response was received from.
    pub url: Url,

    /// Raw `Location` header.
    pub location: Option<String>,

    /// Raw `Content-Disposition` header.
    pub content_disposition: Option<String>,

    /// Declared body length.
    pub content_length: Option<u64>,

    /// Body chunks.
    pub body: BodyStream,
}

impl HttpResponse {
    /// Creates a response with no headers and an empty body.
    #[must_use]
    pub fn new(status: u16, url: Url) -> Self {
        Self {
            status,
            reason: None,
            url,
            location: None,
            content_disposition: None,
            content_length: None,
            body: Box::pin(stream::empty::<Result<Vec<u8>, TransportError>>()),
        }
    }

    /// Creates a response whose body is `bytes`, with `Content-Length` set to match.
    #[must_use]
    pub fn from_bytes(status: u16, url: Url, bytes: Vec<u8>) -> Self {
        let length = bytes.len() as u64;
        Self::new(status, url)
            .with_content_length(Some(length))
            .with_body(Box::pin(stream::once(async move { Ok::<_, TransportError>(bytes) })))
    }

    /// Replaces the body stream.
    #[must_use]
    pub fn with_body(mut self, body: BodyStream) -> Self {
        self.body = body;
        self
    }

    /// Sets the `Location` header.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the `Content-Disposition` header.
    #[must_use]
    pub fn with_content_disposition(mut self, value: impl Into<String>) -> Self {
        self.content_disposition = Some(value.into());
        self
    }

    /// Sets the declared body length.
    #[must_use]
    pub fn with_content_length(mut self, length: Option<u64>) -> Self {
        self.content_length = length;
        self
    }

    /// Sets the reason phrase.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true for statuses that carry a `Location` to follow.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    /// Reason phrase, falling back to the canonical one for the status.
    #[must_use]
    pub fn reason_phrase(&self) -> String {
        self.reason
            .clone()
            .or_else(|| {
                StatusCode::from_u16(self.status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("HTTP {}", self.status))
    }

    /// Reads the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the body stream.
    pub async fn bytes(self) -> Result<Vec<u8>, TransportError> {
        let mut body = self.body;
        let mut buffer = Vec::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer)
    }

    /// Reads the whole body as UTF-8 text, replacing invalid sequences.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the body stream.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("url", &self.url.as_str())
            .field("location", &self.location)
            .field("content_disposition", &self.content_disposition)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
