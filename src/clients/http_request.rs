//! HTTP request descriptor types.
//!
//! This module provides the [`HttpRequest`] type and its builder. A request
//! descriptor is ephemeral: the verb methods construct a fresh one per call.

use std::fmt;
use std::str::FromStr;

use crate::clients::errors::InvalidHttpRequestError;
use crate::clients::request_options::RequestOptions;

/// HTTP methods supported by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP PATCH method.
    Patch,
    /// HTTP DELETE method.
    Delete,
    /// HTTP HEAD method.
    Head,
    /// HTTP OPTIONS method.
    Options,
}

impl HttpMethod {
    /// Returns the upper-case method name as sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Post => write!(f, "post"),
            Self::Put => write!(f, "put"),
            Self::Patch => write!(f, "patch"),
            Self::Delete => write!(f, "delete"),
            Self::Head => write!(f, "head"),
            Self::Options => write!(f, "options"),
        }
    }
}

impl FromStr for HttpMethod {
    type Err = InvalidHttpRequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(InvalidHttpRequestError::InvalidMethod {
                method: s.to_string(),
            }),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Patch => Self::PATCH,
            HttpMethod::Delete => Self::DELETE,
            HttpMethod::Head => Self::HEAD,
            HttpMethod::Options => Self::OPTIONS,
        }
    }
}

/// Content type for HTTP request bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    /// JSON content type (`application/json`).
    Json,
    /// Plain text content type (`text/plain`).
    Text,
    /// URL-encoded form content type (`application/x-www-form-urlencoded`).
    Form,
}

impl DataType {
    /// Returns the MIME type string for this data type.
    #[must_use]
    pub const fn as_content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Text => "text/plain",
            Self::Form => "application/x-www-form-urlencoded",
        }
    }
}

/// A request descriptor: method, URL, body, and caller options.
///
/// # Example
///
/// ```rust
/// use fetch_kit::{DataType, HttpMethod, HttpRequest, RequestOptions};
/// use serde_json::json;
///
/// let request = HttpRequest::builder(HttpMethod::Post, "users")
///     .body(json!({"name": "Ada"}))
///     .body_type(DataType::Json)
///     .options(RequestOptions::new().with_verbose(true))
///     .build()
///     .unwrap();
///
/// assert_eq!(request.http_method, HttpMethod::Post);
/// assert!(request.options.verbose);
/// ```
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The HTTP method for this request.
    pub http_method: HttpMethod,
    /// Absolute URL, or a path resolved against the client's base URL.
    pub url: String,
    /// The request body, if any.
    pub body: Option<serde_json::Value>,
    /// The content type of the body.
    pub body_type: Option<DataType>,
    /// Caller-supplied options, forwarded as given.
    pub options: RequestOptions,
}

impl HttpRequest {
    /// Creates a new builder for constructing an `HttpRequest`.
    #[must_use]
    pub fn builder(method: HttpMethod, url: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, url)
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if:
    /// - `url` is empty
    /// - `body` is `Some` but `body_type` is `None`
    pub fn verify(&self) -> Result<(), InvalidHttpRequestError> {
        if self.url.trim().is_empty() {
            return Err(InvalidHttpRequestError::MissingUrl);
        }

        if self.body.is_some() && self.body_type.is_none() {
            return Err(InvalidHttpRequestError::MissingBodyType);
        }

        Ok(())
    }

    /// Renders the body for sending, according to its type.
    ///
    /// JSON bodies are serialized; text bodies send string values verbatim;
    /// form bodies encode a flat JSON object as `key=value` pairs.
    #[must_use]
    pub fn encoded_body(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        let encoded = match (self.body_type, body) {
            (Some(DataType::Text), serde_json::Value::String(s)) => s.clone(),
            (Some(DataType::Form), serde_json::Value::Object(map)) => map
                .iter()
                .map(|(k, v)| {
                    let value = v.as_str().map_or_else(|| v.to_string(), str::to_string);
                    format!(
                        "{}={}",
                        urlencoding::encode(k),
                        urlencoding::encode(&value)
                    )
                })
                .collect::<Vec<_>>()
                .join("&"),
            _ => body.to_string(),
        };
        Some(encoded)
    }
}

/// Builder for constructing [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    http_method: HttpMethod,
    url: String,
    body: Option<serde_json::Value>,
    body_type: Option<DataType>,
    options: RequestOptions,
}

impl HttpRequestBuilder {
    fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            http_method: method,
            url: url.into(),
            body: None,
            body_type: None,
            options: RequestOptions::default(),
        }
    }

    /// Sets the request body.
    ///
    /// When setting a body, you must also set the body type via [`body_type`](Self::body_type).
    #[must_use]
    pub fn body(mut self, body: impl Into<serde_json::Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the content type of the request body.
    #[must_use]
    pub const fn body_type(mut self, body_type: DataType) -> Self {
        self.body_type = Some(body_type);
        self
    }

    /// Replaces the request options.
    #[must_use]
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Adds a single header to the request options.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    /// Builds the [`HttpRequest`], validating it in the process.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the request fails validation.
    pub fn build(self) -> Result<HttpRequest, InvalidHttpRequestError> {
        let request = self.build_unchecked();
        request.verify()?;
        Ok(request)
    }

    /// Builds the [`HttpRequest`] without validating it.
    ///
    /// [`HttpClient::request`](crate::HttpClient::request) still verifies
    /// the descriptor before sending.
    #[must_use]
    pub fn build_unchecked(self) -> HttpRequest {
        HttpRequest {
            http_method: self.http_method,
            url: self.url,
            body: self.body,
            body_type: self.body_type,
            options: self.options,
        }
    }
}
