//! Robots.txt rules implementation
//!
//! This module evaluates robots.txt content using the robotstxt crate.

use crate::url::Url;
use robotstxt::DefaultMatcher;

/// Robots.txt rules for one crawler user agent
///
/// Rules fetched from a site carry that site's host and only judge URLs on
/// it; URLs on other hosts are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsRules {
    /// Raw robots.txt content (empty string means allow all)
    content: String,

    /// Product token matched against `User-agent` lines
    user_agent: String,

    /// Host the rules were fetched from, if any
    host: Option<String>,
}

impl RobotsRules {
    /// Creates rules from raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    /// * `user_agent` - The crawler's product token, e.g. `WebCrawl`
    pub fn from_content(content: &str, user_agent: &str) -> Self {
        Self {
            content: content.to_string(),
            user_agent: user_agent.to_string(),
            host: None,
        }
    }

    /// Creates permissive rules that allow everything
    ///
    /// Used when robots.txt cannot be fetched.
    pub fn allow_all(user_agent: &str) -> Self {
        Self::from_content("", user_agent)
    }

    /// Restricts the rules to URLs on `host`
    pub fn for_host(mut self, host: &str) -> Self {
        self.host = Some(host.to_ascii_lowercase());
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Checks if a URL or path may be fetched
    ///
    /// # Arguments
    ///
    /// * `url` - An absolute URL or a path such as `/page.html`
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &Url) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        if let (Some(host), Ok(url_host)) = (&self.host, url.to_host()) {
            if !host.eq_ignore_ascii_case(url_host) {
                return true;
            }
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &self.user_agent, url.as_str())
    }
}
