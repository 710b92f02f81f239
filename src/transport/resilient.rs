//! Rate limiting, per-attempt timeout, retry, and redirect chasing layered
//! over any [`HttpTransport`].
//!
//! Every call runs through the layers in a fixed order:
//!
//! 1. wait for a slot from the session-wide [`RateLimiter`]
//! 2. issue the attempt under the per-attempt deadline
//! 3. on a transient failure, back off and go to 1
//! 4. on a redirect, resolve `Location` against the current URL and start over
//!
//! A single [`CancellationToken`] is raced against every wait in that loop.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{DEFAULT_RATE_LIMIT, DEFAULT_REQUEST_TIMEOUT, MAX_REDIRECTS};
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error, classify_http_status};
use super::{HttpResponse, HttpTransport, RateLimiter, TransportError};

/// Request counters for a transport, shared by all of its clones.
#[derive(Debug, Default)]
pub struct TransportStats {
    attempts: AtomicUsize,
    retries: AtomicUsize,
    redirects: AtomicUsize,
}

impl TransportStats {
    /// Returns the number of attempts issued to the backend.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Returns the number of retries scheduled after a failed attempt.
    #[must_use]
    pub fn retries(&self) -> usize {
        self.retries.load(Ordering::SeqCst)
    }

    /// Returns the number of redirect hops followed.
    #[must_use]
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        for counter in [&self.attempts, &self.retries, &self.redirects] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    fn increment_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_retries(&self) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_redirects(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Result of a single attempt, before retry classification.
enum Attempt {
    Response(HttpResponse),
    Error(TransportError),
}

/// An [`HttpTransport`] wrapper adding rate limiting, timeouts, retries, and redirects.
///
/// Cheap to clone; clones share the limiter, counters, and cancellation token.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use plugin_mirror::transport::{RateLimiter, ReqwestTransport, ResilientTransport, RetryPolicy};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = Arc::new(ReqwestTransport::new("plugin-mirror/0.1")?);
/// let transport = ResilientTransport::new(backend)
///     .with_rate_limiter(Arc::new(RateLimiter::per_second(128)))
///     .with_request_timeout(Duration::from_secs(5))
///     .with_retry_policy(RetryPolicy::with_max_retries(6));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResilientTransport {
    inner: Arc<dyn HttpTransport>,
    rate_limiter: Arc<RateLimiter>,
    retry_policy: RetryPolicy,
    request_timeout: Duration,
    max_redirects: usize,
    cancel: CancellationToken,
    stats: Arc<TransportStats>,
}

impl ResilientTransport {
    /// Wraps `inner` with default limits: 128 requests/second, 5 second
    /// attempts, 6 retries, and a fresh cancellation token.
    #[must_use]
    pub fn new(inner: Arc<dyn HttpTransport>) -> Self {
        Self {
            inner,
            rate_limiter: Arc::new(RateLimiter::per_second(DEFAULT_RATE_LIMIT)),
            retry_policy: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_redirects: MAX_REDIRECTS,
            cancel: CancellationToken::new(),
            stats: Arc::new(TransportStats::default()),
        }
    }

    /// Uses a shared rate limiter.
    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Uses a custom retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sets the per-attempt deadline.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Sets the redirect hop limit.
    #[must_use]
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Uses `cancel` as the session cancellation signal.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the cancellation token raced against every request.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the shared request counters.
    #[must_use]
    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Returns the retry policy in use.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Fetches `url`, following redirects until a non-redirect response arrives.
    ///
    /// Transient failures are retried within each hop. A transient status that
    /// outlives the retry budget is returned as the final response rather than
    /// an error, so the caller sees the server's last answer.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Cancelled`] once the session token fires
    /// - [`TransportError::Timeout`] or [`TransportError::Network`] when retries are exhausted
    /// - [`TransportError::InvalidUrl`] for an unresolvable `Location`
    /// - [`TransportError::RedirectLoop`] when the hop limit is exceeded
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let mut current = url.clone();

        for hop in 0..=self.max_redirects {
            let response = self.fetch_with_retry(&current).await?;
            if !response.is_redirect() {
                return Ok(response);
            }
            let Some(location) = response.location.as_deref() else {
                debug!(status = response.status, "redirect without Location, returning as-is");
                return Ok(response);
            };

            let next = current
                .join(location)
                .map_err(|_| TransportError::invalid_url(location))?;
            debug!(hop, from = %current, to = %next, "following redirect");
            self.stats.increment_redirects();
            current = next;
        }

        Err(TransportError::redirect_loop(url.as_str(), self.max_redirects))
    }

    async fn fetch_with_retry(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "issuing request");

            let (failure_type, outcome) = match self.attempt(url).await {
                Attempt::Response(response) => {
                    if response.is_success() || response.is_redirect() {
                        return Ok(response);
                    }
                    (classify_http_status(response.status), Attempt::Response(response))
                }
                Attempt::Error(error) => (classify_error(&error), Attempt::Error(error)),
            };

            let delay = match self.retry_policy.should_retry(failure_type, attempt) {
                RetryDecision::Retry { delay, .. } => delay,
                RetryDecision::DoNotRetry { reason } => {
                    debug!(%reason, "not retrying");
                    return match outcome {
                        Attempt::Response(response) => Ok(response),
                        Attempt::Error(error) => Err(error),
                    };
                }
            };

            // The failed response and its connection are dropped before the backoff
            let cause = match outcome {
                Attempt::Response(response) => format!("HTTP {}", response.status),
                Attempt::Error(error) => error.to_string(),
            };
            info!(
                url = %url,
                attempt = attempt + 1,
                max_attempts = self.retry_policy.max_attempts(),
                delay_ms = delay.as_millis(),
                rate_limited = failure_type == FailureType::RateLimited,
                error = %cause,
                "retrying request"
            );
            self.stats.increment_retries();

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(TransportError::cancelled(url.as_str())),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn attempt(&self, url: &Url) -> Attempt {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                return Attempt::Error(TransportError::cancelled(url.as_str()));
            }
            () = self.rate_limiter.acquire() => {}
        }

        self.stats.increment_attempts();

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Attempt::Error(TransportError::cancelled(url.as_str())),
            result = tokio::time::timeout(self.request_timeout, self.inner.get(url)) => match result {
                Ok(Ok(response)) => Attempt::Response(response),
                Ok(Err(error)) => Attempt::Error(error),
                Err(_) => Attempt::Error(TransportError::timeout(url.as_str(), self.request_timeout)),
            },
        }
    }
}

#[async_trait]
impl HttpTransport for ResilientTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        self.fetch(url).await
    }
}

impl fmt::Debug for ResilientTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientTransport")
            .field("rate_limiter", &self.rate_limiter)
            .field("retry_policy", &self.retry_policy)
            .field("request_timeout", &self.request_timeout)
            .field("max_redirects", &self.max_redirects)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
