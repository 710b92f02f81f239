//! HTTP transport for talking to a plugin repository.
//!
//! The layers, bottom up:
//!
//! - [`HttpTransport`] - one GET, no redirects, streaming body
//! - [`ReqwestTransport`] - the production backend
//! - [`ResilientTransport`] - session rate limit, per-attempt deadline,
//!   exponential backoff, redirect chasing, cancellation
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use plugin_mirror::transport::{ReqwestTransport, ResilientTransport};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(ReqwestTransport::new("plugin-mirror/0.1")?);
//! let transport = ResilientTransport::new(backend);
//! let response = transport
//!     .fetch(&Url::parse("https://plugins.jetbrains.com/plugins/list?build=IC-241.1")?)
//!     .await?;
//! println!("status {}", response.status);
//! # Ok(())
//! # }
//! ```

mod constants;
mod error;
mod http;
pub mod rate_limiter;
mod reqwest_backend;
mod resilient;
mod retry;

pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT, DEFAULT_REQUEST_TIMEOUT,
    MAX_REDIRECTS, RATE_LIMIT_WINDOW, READ_TIMEOUT_SECS,
};
pub use error::{BoxError, TransportError};
pub use http::{BodyStream, HttpResponse, HttpTransport};
pub use rate_limiter::RateLimiter;
pub use reqwest_backend::ReqwestTransport;
pub use resilient::{ResilientTransport, TransportStats};
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error, classify_http_status};
