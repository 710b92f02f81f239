//! Constants for the transport layer (timeouts, rate limiting, retries).

use std::time::Duration;

/// HTTP connect timeout for the reqwest backend (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Whole-request timeout for the reqwest backend, body included (5 minutes for large artifacts).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default per-attempt deadline for receiving a response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default ceiling on requests started per rolling window.
pub const DEFAULT_RATE_LIMIT: usize = 128;

/// Rolling window the rate limit applies to.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(1);

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 6;

/// Maximum number of redirect hops followed for a single request.
pub const MAX_REDIRECTS: usize = 10;
