//! Error types for client configuration.
//!
//! This module contains the error type returned when building a
//! [`ClientConfig`](crate::ClientConfig) or one of its validated newtypes.
//!
//! # Example
//!
//! ```rust
//! use fetch_kit::{BaseUrl, ConfigError};
//!
//! let result = BaseUrl::new("not a url");
//! assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur during client configuration.
///
/// Each variant provides a clear, actionable error message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Base URL is invalid.
    #[error("Invalid base URL '{url}'. Please provide a URL with scheme and host (e.g., 'https://api.example.com').")]
    InvalidBaseUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A default header name is not a valid HTTP header name.
    #[error("Invalid header name '{name}'. Header names must be non-empty visible ASCII without separators.")]
    InvalidHeaderName {
        /// The invalid header name that was provided.
        name: String,
    },

    /// A default header value cannot be sent in an HTTP header.
    #[error("Invalid value for header '{name}'. Header values must not contain control characters such as newlines.")]
    InvalidHeaderValue {
        /// The name of the header whose value was rejected.
        name: String,
    },

    /// Timeout must be greater than zero.
    #[error("Invalid timeout: a request timeout must be greater than zero.")]
    InvalidTimeout,
}
