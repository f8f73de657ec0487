//! HTTP-specific error types.
//!
//! - [`HttpResponseError`]: a non-2xx HTTP response
//! - [`InvalidHttpRequestError`]: a request descriptor that failed validation
//! - [`HttpError`]: unified error type for everything [`HttpClient`](crate::HttpClient) returns
//!
//! # Example
//!
//! ```rust,ignore
//! use fetch_kit::{HttpClient, HttpError, RequestOptions};
//!
//! match client.get("users", RequestOptions::default()).await {
//!     Ok(response) => println!("Success: {}", response.body),
//!     Err(HttpError::Response(e)) => println!("API error {}: {}", e.code, e.message),
//!     Err(HttpError::Aborted { id }) => println!("request {id} was cancelled"),
//!     Err(other) => println!("failed: {other}"),
//! }
//! ```

use thiserror::Error;

use crate::clients::context::ContextId;

/// Error returned when a request receives a non-successful response.
#[derive(Debug, Clone, Error)]
#[error("HTTP {code}: {message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// The response body, serialized as JSON text.
    pub message: String,
    /// Reference ID for error reporting (from the `X-Request-Id` header).
    pub error_reference: Option<String>,
}

/// Error returned when a request descriptor fails validation.
///
/// Raised before anything is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// The HTTP method is not one of the supported methods.
    #[error("Invalid Http method {method}.")]
    InvalidMethod {
        /// The invalid method that was provided.
        method: String,
    },

    /// The request URL is empty.
    #[error("Cannot send a request without a URL.")]
    MissingUrl,

    /// A request body was provided without specifying the body type.
    #[error("Cannot set a body without also setting body_type.")]
    MissingBodyType,
}

/// Unified error type for all HTTP-related errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// An HTTP response error (non-2xx status code).
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request was cancelled before it settled.
    #[error("Request {id} was aborted")]
    Aborted {
        /// The id of the aborted request's context.
        id: ContextId,
    },

    /// A custom transport failed for a reason of its own.
    #[error("Transport error: {message}")]
    Transport {
        /// Description supplied by the transport.
        message: String,
    },
}

impl HttpError {
    /// Returns the HTTP status code if this error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response(e) => Some(e.code),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the request was cancelled.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}
