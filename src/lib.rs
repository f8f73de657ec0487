//! # fetch-kit
//!
//! A small client-side HTTP request helper library.
//!
//! ## Overview
//!
//! This crate provides:
//! - Verb shortcuts (`get`, `post`, `put`, `patch`, `delete`, `head`,
//!   `options`) over one generic [`HttpClient::request`]
//! - A per-request [`RequestContext`] carrying a locally unique id, the start
//!   time, the attempt counter, and a cancellation controller
//! - [`merge_signal`], which links a caller-supplied cancellation token to a
//!   request's controller
//! - Type-safe configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fetch_kit::{BaseUrl, ClientConfig, HttpClient, RequestOptions};
//! use serde_json::json;
//!
//! let config = ClientConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com").unwrap())
//!     .default_header("Authorization", "Bearer token")
//!     .build()
//!     .unwrap();
//!
//! let client = HttpClient::new(config)?;
//!
//! let user = client.get("users/1", RequestOptions::default()).await?;
//! let created = client
//!     .post("users", Some(json!({"name": "Ada"})), RequestOptions::new().with_verbose(true))
//!     .await?;
//! ```
//!
//! ## Retries
//!
//! [`RequestOptions`] carries a [`RetryPolicy`] (`retry`, `retry_delay`,
//! `backoff_type`, `retry_status_codes`). The bundled [`ReqwestTransport`]
//! sends every request once; implement [`Transport`] to act on the policy.
//!
//! ## Logging
//!
//! Events are emitted through `tracing`. Install a subscriber to see them;
//! requests flagged `verbose` log at `info`.

pub mod clients;
pub mod config;
pub mod error;

pub use config::{BaseUrl, ClientConfig, ClientConfigBuilder};
pub use error::ConfigError;

pub use clients::{
    merge_signal, AbortListener, BackoffType, ContextId, ContextIdGenerator, DataType, HttpClient,
    HttpError, HttpMethod, HttpRequest, HttpRequestBuilder, HttpResponse, HttpResponseError,
    InvalidHttpRequestError, ReqwestTransport, RequestContext, RequestMetadata, RequestOptions,
    RetryPolicy, Transport,
};
