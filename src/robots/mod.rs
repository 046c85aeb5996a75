//! Robots.txt handling module
//!
//! The crawler consults an optional [`RobotsGate`] before every fetch and
//! skips disallowed URLs without treating the skip as a failure.
//! [`RobotsRules`] is the robots.txt-backed gate; any `Fn(&Url) -> bool`
//! closure is a gate too.

mod parser;

pub use parser::RobotsRules;

use crate::crawler::Transport;
use crate::url::Url;
use std::time::Duration;

/// Decides whether a URL may be fetched
pub trait RobotsGate: Send + Sync {
    fn allowed(&self, url: &Url) -> bool;
}

impl RobotsGate for RobotsRules {
    fn allowed(&self, url: &Url) -> bool {
        self.is_allowed(url)
    }
}

impl<F> RobotsGate for F
where
    F: Fn(&Url) -> bool + Send + Sync,
{
    fn allowed(&self, url: &Url) -> bool {
        self(url)
    }
}

/// Fetches robots.txt for a site
///
/// Anything other than a successful response (missing file, server error,
/// network failure) yields permissive rules.
///
/// # Arguments
///
/// * `transport` - Transport used for the request
/// * `site` - Any absolute URL on the site
/// * `user_agent` - The crawler's product token
/// * `timeout` - Request timeout
///
/// # Returns
///
/// * `Ok(RobotsRules)` - Rules bound to the site's host
/// * `Err(UrlError)` - `site` is not an absolute URL
pub async fn fetch_robots<T: Transport + ?Sized>(
    transport: &T,
    site: &Url,
    user_agent: &str,
    timeout: Duration,
) -> crate::UrlResult<RobotsRules> {
    let host = site.to_host()?.to_string();
    let robots_url = site.to_base()?.join("/robots.txt")?;

    let rules = match transport.get(&robots_url, timeout).await {
        Ok(response) if response.is_success() => {
            tracing::debug!("Fetched {}", robots_url);
            RobotsRules::from_content(&response.text(), user_agent)
        }
        Ok(response) => {
            tracing::debug!("No robots.txt at {} (status {})", robots_url, response.status);
            RobotsRules::allow_all(user_agent)
        }
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}", robots_url, e);
            RobotsRules::allow_all(user_agent)
        }
    };

    Ok(rules.for_host(&host))
}
