//! HTTP response types.
//!
//! This module provides the [`HttpResponse`] type returned by every
//! successful request.

use std::collections::HashMap;

/// An HTTP response.
///
/// Header names are stored lower case; a header may carry several values.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers (headers may have multiple values).
    pub headers: HashMap<String, Vec<String>>,
    /// The parsed response body.
    pub body: serde_json::Value,
    /// Seconds to wait before retrying (from the `Retry-After` header), for
    /// transports that implement retries.
    pub retry_request_after: Option<f64>,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`, parsing `Retry-After` if present.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, body: serde_json::Value) -> Self {
        let retry_request_after = headers
            .get("retry-after")
            .and_then(|values| values.first())
            .and_then(|value| value.trim().parse::<f64>().ok());

        Self {
            code,
            headers,
            body,
            retry_request_after,
        }
    }

    /// Builds a response from raw parts as received on the wire.
    ///
    /// An empty body becomes `{}`. A body that is not JSON becomes
    /// `{"raw_body": "<text>"}` so that nothing the server sent is lost.
    #[must_use]
    pub fn from_parts(code: u16, headers: &reqwest::header::HeaderMap, body_text: &str) -> Self {
        let body = if body_text.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(body_text)
                .unwrap_or_else(|_| serde_json::json!({ "raw_body": body_text }))
        };
        Self::new(code, parse_response_headers(headers), body)
    }

    /// Returns `true` if the response status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the first value of a header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header("x-request-id")
    }
}

/// Flattens a reqwest header map into lower-case names with all values.
fn parse_response_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, Vec<String>> {
    let mut result: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        let key = name.as_str().to_lowercase();
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        result.entry(key).or_default().push(value);
    }
    result
}
