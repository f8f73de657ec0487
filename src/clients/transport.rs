//! The seam between [`HttpClient`](crate::HttpClient) and the network.
//!
//! A [`Transport`] performs the actual exchange for a [`RequestContext`].
//! [`ReqwestTransport`] sends each request exactly once with `reqwest`;
//! a custom transport can implement retries from the request's
//! [`RetryPolicy`](crate::RetryPolicy), record traffic in tests, or route
//! requests elsewhere.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::clients::context::RequestContext;
use crate::clients::errors::{HttpError, HttpResponseError};
use crate::clients::http_response::HttpResponse;
use crate::config::ClientConfig;

/// Library version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Performs the exchange for one request context.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `ctx.request` and returns the response.
    ///
    /// Implementations should return non-2xx responses as
    /// [`HttpError::Response`]. Cancellation is handled by the caller, which
    /// drops this future when the context's controller fires.
    async fn send(&self, ctx: &RequestContext) -> Result<HttpResponse, HttpError>;
}

/// [`Transport`] backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: ClientConfig,
    default_headers: HashMap<String, String>,
}

impl ReqwestTransport {
    /// Creates a transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the underlying reqwest client cannot
    /// be created (e.g., TLS initialization failure).
    pub fn new(config: ClientConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder().use_rustls_tls().build()?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a transport around an existing reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Self {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent = format!("{user_agent_prefix}fetch-kit v{SDK_VERSION} | Rust {rust_version}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());
        for (key, value) in config.default_headers() {
            default_headers.insert(key.clone(), value.clone());
        }

        Self {
            client,
            config,
            default_headers,
        }
    }

    /// Returns the headers sent with every request.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Returns the configuration this transport was built from.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolves a request URL against the configured base URL.
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        self.config
            .base_url()
            .map_or_else(|| url.to_string(), |base| base.join(url))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, ctx: &RequestContext) -> Result<HttpResponse, HttpError> {
        let request = &ctx.request;
        let url = self.resolve_url(&request.url);

        // Request headers override defaults, case-insensitively
        let mut headers: HashMap<String, String> = HashMap::new();
        for (key, value) in self.default_headers.iter().chain(&request.options.headers) {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(key));
            headers.insert(key.clone(), value.clone());
        }
        if let Some(body_type) = request.body_type {
            if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                headers.insert(
                    "Content-Type".to_string(),
                    body_type.as_content_type().to_string(),
                );
            }
        }

        let mut req_builder = self
            .client
            .request(request.http_method.into(), &url);
        for (key, value) in &headers {
            req_builder = req_builder.header(key, value);
        }
        if !request.options.query.is_empty() {
            req_builder = req_builder.query(&request.options.query);
        }
        if let Some(body) = request.encoded_body() {
            req_builder = req_builder.body(body);
        }
        if let Some(timeout) = request.options.timeout.or_else(|| self.config.timeout()) {
            req_builder = req_builder.timeout(timeout);
        }

        tracing::debug!(
            context_id = %ctx.id(),
            attempt = ctx.attempt,
            method = request.http_method.as_str(),
            url = %url,
            "sending request"
        );

        let res = req_builder.send().await?;
        let code = res.status().as_u16();
        let res_headers = res.headers().clone();
        let body_text = res.text().await?;
        let response = HttpResponse::from_parts(code, &res_headers, &body_text);

        if response.is_ok() {
            return Ok(response);
        }

        Err(HttpError::Response(HttpResponseError {
            code,
            message: serde_json::to_string(&response.body).unwrap_or_else(|_| "{}".to_string()),
            error_reference: response.request_id().map(String::from),
        }))
    }
}

// Verify ReqwestTransport is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ReqwestTransport>();
};
