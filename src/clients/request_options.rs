//! Per-request options.
//!
//! [`RequestOptions`] carries everything a caller can attach to a request
//! besides its method, URL, and body: headers, query parameters, a
//! cancellation signal, the verbose flag, a timeout, and a [`RetryPolicy`].
//!
//! The retry fields are carried for the benefit of a [`Transport`](crate::Transport)
//! that implements retries; [`ReqwestTransport`](crate::ReqwestTransport)
//! sends every request exactly once.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Status codes treated as transient by default.
pub const DEFAULT_RETRY_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How the delay between attempts grows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffType {
    /// The same delay before every attempt.
    #[default]
    Fixed,
    /// Delay grows linearly with the attempt number.
    Linear,
    /// Delay doubles with every attempt.
    Exponential,
}

impl fmt::Display for BackoffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Linear => write!(f, "linear"),
            Self::Exponential => write!(f, "exponential"),
        }
    }
}

impl FromStr for BackoffType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            other => Err(format!("unknown backoff type '{other}'")),
        }
    }
}

/// Retry settings attached to a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt (default: 0).
    pub retry: u32,
    /// Base delay between attempts.
    #[serde(with = "duration_millis")]
    pub retry_delay: Duration,
    /// How the delay grows between attempts.
    pub backoff_type: BackoffType,
    /// Response status codes considered transient.
    pub retry_status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
            backoff_type: BackoffType::default(),
            retry_status_codes: DEFAULT_RETRY_STATUS_CODES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Returns `true` if `code` is one of the configured transient codes.
    #[must_use]
    pub fn is_retryable_status(&self, code: u16) -> bool {
        self.retry_status_codes.contains(&code)
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Options attached to a single request.
///
/// Verb methods on [`HttpClient`](crate::HttpClient) forward these untouched.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use fetch_kit::{BackoffType, RequestOptions};
/// use tokio_util::sync::CancellationToken;
///
/// let signal = CancellationToken::new();
/// let options = RequestOptions::new()
///     .with_header("Authorization", "Bearer token")
///     .with_query("limit", "50")
///     .with_signal(signal.clone())
///     .with_verbose(true)
///     .with_retry(3)
///     .with_backoff_type(BackoffType::Exponential);
///
/// assert_eq!(options.retry.retry, 3);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Headers to send with this request.
    pub headers: HashMap<String, String>,
    /// Query parameters to append to the URL.
    pub query: HashMap<String, String>,
    /// Caller-owned cancellation signal.
    pub signal: Option<CancellationToken>,
    /// Log the request and its outcome at `info` level.
    pub verbose: bool,
    /// Timeout for this request, overriding the client default.
    pub timeout: Option<Duration>,
    /// Retry settings for an external retry engine.
    pub retry: RetryPolicy,
}

impl RequestOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Attaches a cancellation signal owned by the caller.
    #[must_use]
    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Sets the verbose flag.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the timeout for this request.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the number of retries.
    #[must_use]
    pub const fn with_retry(mut self, retry: u32) -> Self {
        self.retry.retry = retry;
        self
    }

    /// Sets the base delay between attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry.retry_delay = delay;
        self
    }

    /// Sets the backoff type.
    #[must_use]
    pub const fn with_backoff_type(mut self, backoff_type: BackoffType) -> Self {
        self.retry.backoff_type = backoff_type;
        self
    }

    /// Replaces the list of transient status codes.
    #[must_use]
    pub fn with_retry_status_codes(mut self, codes: impl Into<Vec<u16>>) -> Self {
        self.retry.retry_status_codes = codes.into();
        self
    }
}
