//! HTTP client with verb shortcuts.
//!
//! This module provides the [`HttpClient`] type. Every verb method builds a
//! fresh [`HttpRequest`] and forwards it to [`HttpClient::request`], which
//! owns the request's [`RequestContext`] for as long as it is in flight.

use std::sync::Arc;

use serde_json::Value;

use crate::clients::context::{ContextIdGenerator, RequestContext};
use crate::clients::errors::HttpError;
use crate::clients::http_request::{DataType, HttpMethod, HttpRequest};
use crate::clients::http_response::HttpResponse;
use crate::clients::request_options::RequestOptions;
use crate::clients::signal::merge_signal;
use crate::clients::transport::{ReqwestTransport, Transport};
use crate::config::ClientConfig;

/// HTTP client exposing GET/POST/PUT/PATCH/DELETE/HEAD/OPTIONS shortcuts.
///
/// The client handles:
/// - Request descriptor validation
/// - Context creation with a locally unique id
/// - Merging the caller's cancellation signal into the request
/// - Verbose request/response logging
///
/// The exchange itself is delegated to a [`Transport`].
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use fetch_kit::{BaseUrl, ClientConfig, HttpClient, RequestOptions};
/// use serde_json::json;
///
/// let config = ClientConfig::builder()
///     .base_url(BaseUrl::new("https://api.example.com").unwrap())
///     .build()
///     .unwrap();
/// let client = HttpClient::new(config)?;
///
/// let users = client.get("users", RequestOptions::default()).await?;
/// let created = client
///     .post("users", Some(json!({"name": "Ada"})), RequestOptions::default())
///     .await?;
/// ```
#[derive(Debug)]
pub struct HttpClient<T: Transport = ReqwestTransport> {
    transport: T,
    ids: Arc<ContextIdGenerator>,
    verbose: bool,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient<ReqwestTransport> {
    /// Creates a client that sends requests with `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the reqwest client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, HttpError> {
        let verbose = config.verbose();
        let transport = ReqwestTransport::new(config)?;
        Ok(Self {
            transport,
            ids: ContextIdGenerator::shared(),
            verbose,
        })
    }
}

impl<T: Transport> HttpClient<T> {
    /// Creates a client around a custom transport.
    #[must_use]
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            ids: ContextIdGenerator::shared(),
            verbose: false,
        }
    }

    /// Uses `ids` instead of the process-wide id generator.
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<ContextIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Logs every request as if `verbose` were set on it.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the id generator used for request contexts.
    #[must_use]
    pub fn id_generator(&self) -> &ContextIdGenerator {
        &self.ids
    }

    /// Sends a request descriptor.
    ///
    /// This method handles:
    /// - Request validation
    /// - Context creation
    /// - Signal merging (aborting the caller's signal aborts the request)
    /// - Verbose logging
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if:
    /// - Request validation fails (`InvalidRequest`)
    /// - The caller's signal fires before the request settles (`Aborted`)
    /// - The transport fails (`Network`, `Response`, `Transport`)
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;

        let mut ctx = RequestContext::new(request, &self.ids);
        let verbose = self.verbose || ctx.request.options.verbose;
        let listener = merge_signal(ctx.request.options.signal.as_ref(), &ctx, move |id| {
            if verbose {
                tracing::info!(context_id = %id, "request aborted by caller");
            }
        });

        if verbose {
            tracing::info!(
                context_id = %ctx.id(),
                method = ctx.request.http_method.as_str(),
                url = %ctx.request.url,
                "request started"
            );
        }

        let controller = ctx.controller.clone();
        let outcome = tokio::select! {
            biased;
            () = controller.cancelled() => Err(HttpError::Aborted { id: ctx.id() }),
            result = self.transport.send(&ctx) => result,
        };

        // Settled: later signal aborts must not touch this context
        if let Some(listener) = listener {
            listener.release();
        }

        match outcome {
            Ok(response) => {
                if verbose {
                    tracing::info!(
                        context_id = %ctx.id(),
                        status = response.code,
                        elapsed_ms = u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "request completed"
                    );
                }
                ctx.record_response(response);
            }
            Err(error) => {
                if verbose {
                    tracing::warn!(
                        context_id = %ctx.id(),
                        error = %error,
                        "request failed"
                    );
                }
                ctx.record_error(error);
            }
        }

        ctx.into_result()
    }

    /// Sends a GET request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get(
        &self,
        url: impl Into<String> + Send,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        self.request(Self::descriptor(HttpMethod::Get, url, None, options))
            .await
    }

    /// Sends a POST request with an optional JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn post(
        &self,
        url: impl Into<String> + Send,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        self.request(Self::descriptor(HttpMethod::Post, url, body, options))
            .await
    }

    /// Sends a PUT request with an optional JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn put(
        &self,
        url: impl Into<String> + Send,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        self.request(Self::descriptor(HttpMethod::Put, url, body, options))
            .await
    }

    /// Sends a PATCH request with an optional JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn patch(
        &self,
        url: impl Into<String> + Send,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        self.request(Self::descriptor(HttpMethod::Patch, url, body, options))
            .await
    }

    /// Sends a DELETE request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn delete(
        &self,
        url: impl Into<String> + Send,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        self.request(Self::descriptor(HttpMethod::Delete, url, None, options))
            .await
    }

    /// Sends a HEAD request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn head(
        &self,
        url: impl Into<String> + Send,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        self.request(Self::descriptor(HttpMethod::Head, url, None, options))
            .await
    }

    /// Sends an OPTIONS request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn options(
        &self,
        url: impl Into<String> + Send,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        self.request(Self::descriptor(HttpMethod::Options, url, None, options))
            .await
    }

    /// Builds the descriptor a verb method forwards. Only the method and body
    /// are set here; `options` pass through as given.
    fn descriptor(
        method: HttpMethod,
        url: impl Into<String>,
        body: Option<Value>,
        options: RequestOptions,
    ) -> HttpRequest {
        let body_type = body.as_ref().map(|_| DataType::Json);
        HttpRequest {
            http_method: method,
            url: url.into(),
            body,
            body_type,
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Records every context it is handed and answers 200.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(HttpMethod, String, Option<Value>, Option<u64>)>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, ctx: &RequestContext) -> Result<HttpResponse, HttpError> {
            self.seen.lock().unwrap().push((
                ctx.request.http_method,
                ctx.request.url.clone(),
                ctx.request.body.clone(),
                Some(ctx.id().sequence()),
            ));
            Ok(HttpResponse::new(200, HashMap::new(), json!({"ok": true})))
        }
    }

    /// Never answers.
    struct Hang;

    #[async_trait]
    impl Transport for Hang {
        async fn send(&self, _ctx: &RequestContext) -> Result<HttpResponse, HttpError> {
            std::future::pending().await
        }
    }

    fn client() -> HttpClient<Recorder> {
        HttpClient::with_transport(Recorder::default())
            .with_id_generator(Arc::new(ContextIdGenerator::new()))
    }

    #[tokio::test]
    async fn test_each_verb_sets_its_method() {
        let client = client();
        let opts = RequestOptions::default;

        client.get("a", opts()).await.unwrap();
        client.post("a", None, opts()).await.unwrap();
        client.put("a", None, opts()).await.unwrap();
        client.patch("a", None, opts()).await.unwrap();
        client.delete("a", opts()).await.unwrap();
        client.head("a", opts()).await.unwrap();
        client.options("a", opts()).await.unwrap();

        let methods: Vec<HttpMethod> = client
            .transport()
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|(m, ..)| *m)
            .collect();
        assert_eq!(
            methods,
            vec![
                HttpMethod::Get,
                HttpMethod::Post,
                HttpMethod::Put,
                HttpMethod::Patch,
                HttpMethod::Delete,
                HttpMethod::Head,
                HttpMethod::Options,
            ]
        );
    }

    #[tokio::test]
    async fn test_body_is_forwarded_as_json() {
        let client = client();
        client
            .patch("users/1", Some(json!({"name": "Ada"})), RequestOptions::default())
            .await
            .unwrap();

        let seen = client.transport().seen.lock().unwrap();
        assert_eq!(seen[0].1, "users/1");
        assert_eq!(seen[0].2, Some(json!({"name": "Ada"})));
    }

    #[test]
    fn test_descriptor_leaves_options_untouched() {
        let signal = CancellationToken::new();
        let options = RequestOptions::new()
            .with_header("X-Trace", "1")
            .with_query("q", "rust")
            .with_signal(signal.clone())
            .with_verbose(true)
            .with_timeout(Duration::from_secs(2))
            .with_retry(4);

        let request = HttpClient::<Recorder>::descriptor(
            HttpMethod::Put,
            "items/9",
            Some(json!([1, 2])),
            options,
        );

        assert_eq!(request.http_method, HttpMethod::Put);
        assert_eq!(request.body_type, Some(DataType::Json));
        assert_eq!(request.options.headers.get("X-Trace"), Some(&"1".to_string()));
        assert_eq!(request.options.query.get("q"), Some(&"rust".to_string()));
        assert!(request.options.verbose);
        assert_eq!(request.options.timeout, Some(Duration::from_secs(2)));
        assert_eq!(request.options.retry.retry, 4);
        signal.cancel();
        assert!(request.options.signal.unwrap().is_cancelled());
    }

    #[test]
    fn test_descriptor_without_body_has_no_body_type() {
        let request =
            HttpClient::<Recorder>::descriptor(HttpMethod::Get, "x", None, RequestOptions::default());
        assert!(request.body.is_none());
        assert!(request.body_type.is_none());
    }

    #[tokio::test]
    async fn test_each_request_gets_a_fresh_context_id() {
        let client = client();
        client.get("a", RequestOptions::default()).await.unwrap();
        client.get("b", RequestOptions::default()).await.unwrap();

        let seen = client.transport().seen.lock().unwrap();
        assert_eq!(seen[0].3, Some(1));
        assert_eq!(seen[1].3, Some(2));
        assert_eq!(client.id_generator().current(), 2);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_sending() {
        let client = client();
        let result = client.get("", RequestOptions::default()).await;

        assert!(matches!(result, Err(HttpError::InvalidRequest(_))));
        assert!(client.transport().seen.lock().unwrap().is_empty());
        assert_eq!(client.id_generator().current(), 0);
    }

    #[tokio::test]
    async fn test_user_signal_aborts_in_flight_request() {
        let client = HttpClient::with_transport(Hang)
            .with_id_generator(Arc::new(ContextIdGenerator::new()));
        let signal = CancellationToken::new();

        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = client
            .get("slow", RequestOptions::new().with_signal(signal))
            .await;

        match result {
            Err(HttpError::Aborted { id }) => assert_eq!(id.sequence(), 1),
            other => panic!("expected Aborted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_signal_after_completion_has_no_effect() {
        let client = client();
        let signal = CancellationToken::new();

        let response = client
            .get("a", RequestOptions::new().with_signal(signal.clone()))
            .await
            .unwrap();
        signal.cancel();

        assert_eq!(response.code, 200);
    }
}
