//! HTTP transport
//!
//! This module defines the seam between the crawler and the network:
//! - [`Transport`]: a single GET with a timeout, no redirect following
//! - [`Response`]: status, lowercased headers and raw body
//! - [`ReqwestTransport`]: the production implementation on `reqwest`
//!
//! Redirects are never followed here; the resolver walks every hop itself.

use crate::config::UserAgentConfig;
use crate::url::Url;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A single HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The URL that was requested
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,

    /// Raw body bytes
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Adds a header; the name is stored lowercased
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `Location` header of a redirect
    pub fn location(&self) -> Option<&str> {
        self.header("location").map(str::trim).filter(|l| !l.is_empty())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// True for HTML content types, or when no content type was sent
    pub fn is_html(&self) -> bool {
        self.content_type().map_or(true, |ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml+xml")
        })
    }

    /// The body decoded as UTF-8, invalid sequences replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Broad classes of transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Connect => f.write_str("connection failed"),
            Self::Other => f.write_str("request failed"),
        }
    }
}

/// A network-level failure (timeout, DNS, refused or reset connection)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, e.to_string())
    }
}

/// Issues single GET requests
///
/// Implementations must not follow redirects: a 3xx response is returned
/// as-is with its `Location` header.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<Response, TransportError> {
        (**self).get(url, timeout).await
    }
}

/// Formats the crawler user agent: `Name/Version (+ContactURL; ContactEmail)`
pub fn user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use webcrawl::config::UserAgentConfig;
/// use webcrawl::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "WebCrawl".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
///     contact_email: "bot@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent(config))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Transport`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps an existing client; it must not follow redirects itself
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client identified by the configured user agent
    pub fn from_config(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<Response, TransportError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(Response {
            url: url.to_string(),
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config();
        assert!(build_http_client(&config).is_ok());
        assert!(ReqwestTransport::from_config(&config).is_ok());
    }

    #[test]
    fn test_user_agent_format() {
        assert_eq!(
            user_agent(&create_test_config()),
            "TestCrawler/1.0 (+https://example.com/about; admin@example.com)"
        );
    }

    #[test]
    fn test_response_helpers() {
        let redirect = Response::new("https://a.com/", 301).with_header("Location", " /next ");
        assert!(redirect.is_redirect());
        assert!(!redirect.is_success());
        assert_eq!(redirect.location(), Some("/next"));
        assert_eq!(redirect.header("LOCATION"), Some(" /next "));

        let page = Response::new("https://a.com/", 200)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body("<p>hi</p>");
        assert!(page.is_success());
        assert!(page.is_html());
        assert_eq!(page.text(), "<p>hi</p>");
        assert_eq!(page.location(), None);
    }

    #[test]
    fn test_content_type_gate() {
        let json = Response::new("https://a.com/", 200).with_header("content-type", "application/json");
        assert!(!json.is_html());

        let untyped = Response::new("https://a.com/", 200);
        assert!(untyped.is_html());
    }
}
