//! HTTP client layer.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`HttpClient`]: verb shortcuts over one generic `request` operation
//! - [`HttpRequest`]: a request descriptor (method, URL, body, options)
//! - [`RequestOptions`]: headers, query, signal, verbose flag, retry settings
//! - [`RequestContext`]: per-request metadata and cancellation state
//! - [`ContextIdGenerator`]: the counter behind context ids
//! - [`merge_signal`]: links a caller's cancellation token to a context
//! - [`Transport`]: the seam to the network, with [`ReqwestTransport`] as default
//!
//! # Example
//!
//! ```rust,ignore
//! use fetch_kit::{ClientConfig, HttpClient, RequestOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = HttpClient::new(ClientConfig::default())?;
//! let signal = CancellationToken::new();
//!
//! let response = client
//!     .get(
//!         "https://api.example.com/users",
//!         RequestOptions::new().with_signal(signal.clone()),
//!     )
//!     .await?;
//! ```
//!
//! # Cancellation
//!
//! Cancelling the token passed as `signal` while a request is in flight
//! aborts that request with [`HttpError::Aborted`]. The caller's token is
//! never cancelled by the client.

mod context;
mod errors;
mod http_client;
mod http_request;
mod http_response;
mod request_options;
mod signal;
mod transport;

pub use context::{ContextId, ContextIdGenerator, RequestContext, RequestMetadata};
pub use errors::{HttpError, HttpResponseError, InvalidHttpRequestError};
pub use http_client::HttpClient;
pub use http_request::{DataType, HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::HttpResponse;
pub use request_options::{
    BackoffType, RequestOptions, RetryPolicy, DEFAULT_RETRY_DELAY, DEFAULT_RETRY_STATUS_CODES,
};
pub use signal::{merge_signal, AbortListener};
pub use transport::{ReqwestTransport, Transport, SDK_VERSION};
