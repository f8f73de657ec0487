//! Configuration types for the HTTP client.
//!
//! # Overview
//!
//! - [`ClientConfig`]: settings shared by every request a client sends
//! - [`ClientConfigBuilder`]: a builder for constructing [`ClientConfig`] instances
//! - [`BaseUrl`]: a validated base URL for resolving relative request URLs
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use fetch_kit::{BaseUrl, ClientConfig};
//!
//! let config = ClientConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com").unwrap())
//!     .default_header("X-Api-Key", "secret")
//!     .timeout(Duration::from_secs(10))
//!     .build()
//!     .unwrap();
//! ```

mod newtypes;

pub use newtypes::BaseUrl;

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};

use crate::error::ConfigError;

/// Configuration for an [`HttpClient`](crate::HttpClient).
///
/// Every field is optional; [`ClientConfig::default`] produces a client that
/// sends absolute URLs with no extra headers and no timeout.
///
/// # Thread Safety
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`.
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    base_url: Option<BaseUrl>,
    default_headers: HashMap<String, String>,
    timeout: Option<Duration>,
    user_agent_prefix: Option<String>,
    verbose: bool,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the base URL, if configured.
    #[must_use]
    pub const fn base_url(&self) -> Option<&BaseUrl> {
        self.base_url.as_ref()
    }

    /// Returns the headers sent with every request.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Returns the default request timeout, if configured.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the User-Agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns whether every request is logged as if `verbose` were set.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for constructing [`ClientConfig`] instances.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<BaseUrl>,
    default_headers: HashMap<String, String>,
    timeout: Option<Duration>,
    user_agent_prefix: Option<String>,
    verbose: bool,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL that relative request URLs are resolved against.
    #[must_use]
    pub fn base_url(mut self, url: BaseUrl) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Adds a header sent with every request.
    ///
    /// Request-level headers with the same name take precedence.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Sets the default per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a prefix for the User-Agent header.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Enables verbose logging for every request.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Builds the [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHeaderName`] or
    /// [`ConfigError::InvalidHeaderValue`] if a default header cannot be sent,
    /// and [`ConfigError::InvalidTimeout`] if the timeout is zero.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        for (name, value) in &self.default_headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(ConfigError::InvalidHeaderName { name: name.clone() });
            }
            if HeaderValue::from_str(value).is_err() {
                return Err(ConfigError::InvalidHeaderValue { name: name.clone() });
            }
        }

        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(ClientConfig {
            base_url: self.base_url,
            default_headers: self.default_headers,
            timeout: self.timeout,
            user_agent_prefix: self.user_agent_prefix,
            verbose: self.verbose,
        })
    }
}
