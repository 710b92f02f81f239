//! Session-wide request rate limiting.
//!
//! This module provides the [`RateLimiter`] struct which caps how many
//! requests may *start* within any rolling window, across every task sharing
//! the limiter.
//!
//! # Overview
//!
//! The limiter keeps the start times of the most recent requests. A caller
//! that would exceed the ceiling waits until the oldest start leaves the
//! window. Waiters are served in arrival order because the start log sits
//! behind a fair `tokio::sync::Mutex` that is held while waiting.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use plugin_mirror::transport::RateLimiter;
//!
//! # async fn example() {
//! let limiter = Arc::new(RateLimiter::per_second(128));
//!
//! // Proceeds immediately while under the ceiling
//! limiter.acquire().await;
//! # }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, trace};

use super::constants::RATE_LIMIT_WINDOW;

/// Sliding-window limiter shared by every request of a session.
///
/// Wrap in `Arc` to share across spawned Tokio tasks.
#[derive(Debug)]
pub struct RateLimiter {
    /// Requests allowed to start per window.
    max_requests: usize,

    /// Length of the rolling window.
    window: Duration,

    /// Whether rate limiting is disabled (for `--rate-limit 0`).
    disabled: bool,

    /// Start times of requests still inside the window, oldest first.
    starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_requests` starts per `window`.
    ///
    /// A `max_requests` of zero disables limiting.
    #[must_use]
    #[instrument(skip_all, fields(max_requests = max_requests, window_ms = window.as_millis()))]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        if max_requests == 0 {
            return Self::disabled();
        }
        debug!("creating rate limiter");
        Self {
            max_requests,
            window,
            disabled: false,
            starts: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Creates a limiter allowing `max_requests` starts per second.
    #[must_use]
    pub fn per_second(max_requests: usize) -> Self {
        Self::new(max_requests, RATE_LIMIT_WINDOW)
    }

    /// Creates a disabled rate limiter that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        debug!("creating disabled rate limiter");
        Self {
            max_requests: 0,
            window: Duration::ZERO,
            disabled: true,
            starts: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns whether rate limiting is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the per-window ceiling.
    #[must_use]
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Returns the window length.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Waits until a new request may start, then records its start.
    ///
    /// Callers queue in FIFO order when the ceiling is reached. Dropping the
    /// returned future while it waits releases the queue position without
    /// recording a start.
    pub async fn acquire(&self) {
        if self.disabled {
            return;
        }

        let mut starts = self.starts.lock().await;
        loop {
            let now = Instant::now();
            while starts
                .front()
                .is_some_and(|oldest| now.duration_since(*oldest) >= self.window)
            {
                starts.pop_front();
            }

            if starts.len() < self.max_requests {
                starts.push_back(now);
                trace!(in_window = starts.len(), "rate limit slot acquired");
                return;
            }

            let Some(oldest) = starts.front().copied() else {
                // max_requests is at least 1 here, so a full window is never empty
                continue;
            };
            let resume_at = oldest + self.window;
            debug!(
                wait_ms = resume_at.saturating_duration_since(now).as_millis(),
                "rate limit reached, waiting"
            );
            tokio::time::sleep_until(resume_at).await;
        }
    }
}
