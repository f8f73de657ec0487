//! Validated newtype wrappers for configuration values.
//!
//! Invalid values are rejected on construction with clear error messages.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A validated base URL that relative request URLs are resolved against.
///
/// The URL must carry an alphabetic scheme and a non-empty host. Trailing
/// slashes are trimmed so that joining with a path never doubles them.
///
/// # Example
///
/// ```rust
/// use fetch_kit::BaseUrl;
///
/// let url = BaseUrl::new("https://api.example.com/v1/").unwrap();
/// assert_eq!(url.as_ref(), "https://api.example.com/v1");
/// assert_eq!(url.scheme(), "https");
/// assert_eq!(url.host_name(), "api.example.com");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseUrl {
    url: String,
    scheme_end: usize,
    host_start: usize,
    host_end: usize,
}

impl BaseUrl {
    /// Creates a new validated base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the URL has no scheme or host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let url = url.trim().trim_end_matches('/').to_string();
        let invalid = || ConfigError::InvalidBaseUrl { url: url.clone() };

        let scheme_end = url.find("://").ok_or_else(invalid)?;
        let scheme = &url[..scheme_end];
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let host_start = scheme_end + 3;
        let remainder = &url[host_start..];
        let host_end = remainder
            .find([':', '/', '?', '#'])
            .map_or(url.len(), |i| host_start + i);

        if host_end == host_start || url[host_start..host_end].contains(char::is_whitespace) {
            return Err(invalid());
        }

        Ok(Self {
            url,
            scheme_end,
            host_start,
            host_end,
        })
    }

    /// Returns the URL scheme (e.g., "https").
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.url[..self.scheme_end]
    }

    /// Returns the host name portion of the URL.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.url[self.host_start..self.host_end]
    }

    /// Resolves a request URL against this base.
    ///
    /// Absolute URLs (anything containing `://`) are returned unchanged.
    #[must_use]
    pub fn join(&self, url: &str) -> String {
        if url.contains("://") {
            return url.to_string();
        }
        format!("{}/{}", self.url, url.trim_start_matches('/'))
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl Serialize for BaseUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.url)
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_accepts_https_host() {
        let url = BaseUrl::new("https://api.example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_name(), "api.example.com");
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let url = BaseUrl::new("http://localhost:8080/api/").unwrap();
        assert_eq!(url.as_ref(), "http://localhost:8080/api");
        assert_eq!(url.host_name(), "localhost");
    }

    #[test]
    fn test_base_url_rejects_missing_scheme() {
        assert!(matches!(
            BaseUrl::new("api.example.com"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_base_url_rejects_empty_host() {
        assert!(BaseUrl::new("https://").is_err());
        assert!(BaseUrl::new("https:///path").is_err());
    }

    #[test]
    fn test_base_url_rejects_non_alphabetic_scheme() {
        assert!(BaseUrl::new("ht1p://example.com").is_err());
    }

    #[test]
    fn test_join_relative_path() {
        let url = BaseUrl::new("https://api.example.com/v1").unwrap();
        assert_eq!(url.join("users"), "https://api.example.com/v1/users");
        assert_eq!(url.join("/users"), "https://api.example.com/v1/users");
    }

    #[test]
    fn test_join_keeps_absolute_url() {
        let url = BaseUrl::new("https://api.example.com").unwrap();
        assert_eq!(
            url.join("https://other.example.com/x"),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_base_url_serde_roundtrip_validates() {
        let url: BaseUrl = serde_json::from_str(r#""https://api.example.com/""#).unwrap();
        assert_eq!(url.as_ref(), "https://api.example.com");
        assert_eq!(
            serde_json::to_string(&url).unwrap(),
            r#""https://api.example.com""#
        );

        let bad: Result<BaseUrl, _> = serde_json::from_str(r#""nope""#);
        assert!(bad.is_err());
    }
}
