use crate::crawler::{DEFAULT_FOLLOW, DEFAULT_REDIRECT_LIMIT, DEFAULT_TIMEOUT};
use serde::Deserialize;

/// Main configuration structure for WebCrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

/// Fetch and redirect policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of redirect hops per fetch
    #[serde(rename = "redirect-limit")]
    pub redirect_limit: usize,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: f64,

    /// Whether a redirect may leave the allowed domain
    #[serde(rename = "follow-external-redirects")]
    pub follow_external_redirects: bool,

    /// Allowed domain pattern (e.g., "example.com" or "*.example.com");
    /// defaults to the host being fetched
    pub domain: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
            timeout_secs: DEFAULT_TIMEOUT.as_secs_f64(),
            follow_external_redirects: true,
            domain: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Site crawl link selection and filters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Selector expression for the hrefs to follow
    pub follow: String,

    /// Glob patterns a path must match (any), when non-empty
    #[serde(rename = "allow-paths")]
    pub allow_paths: Vec<String>,

    /// Glob patterns excluding paths
    #[serde(rename = "disallow-paths")]
    pub disallow_paths: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            follow: DEFAULT_FOLLOW.to_string(),
            allow_paths: Vec::new(),
            disallow_paths: Vec::new(),
        }
    }
}
