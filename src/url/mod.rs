//! URL handling module
//!
//! This module provides the [`Url`] value type used across the crawler: an
//! absolute or relative web address that also carries crawl bookkeeping
//! (visited flag, timestamp, duration and redirect history).

mod derive;
mod matcher;

pub use matcher::matches_wildcard;

use crate::{UrlError, UrlResult};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::time::Duration;

/// A web address plus the crawl metadata recorded against it
///
/// A `Url` is either absolute (it has a scheme and a host) or relative (it
/// has neither). Equality and hashing use the raw string form only, so crawl
/// metadata never affects set membership.
#[derive(Clone)]
pub struct Url {
    /// The address as given, trimmed
    raw: String,

    /// Parsed form, present only for absolute URLs
    parsed: Option<::url::Url>,

    /// Whether a fetch has been attempted
    crawled: bool,

    /// When the last fetch attempt finished
    date_crawled: Option<DateTime<Utc>>,

    /// How long the last fetch attempt took, in seconds
    crawl_duration: Option<f64>,

    /// Redirect hops recorded during resolution, in order
    redirects: Vec<(Url, Url)>,
}

impl Url {
    /// Parses a string into a `Url`
    ///
    /// Absolute forms must use the `http` or `https` scheme and carry a host.
    /// Anything the URL parser reports as "relative without a base" is kept
    /// as a relative URL. Protocol-relative forms (`//host/path`) are rejected
    /// because they have a host but no scheme.
    ///
    /// # Examples
    ///
    /// ```
    /// use webcrawl::Url;
    ///
    /// let url = Url::parse("https://example.com/about").unwrap();
    /// assert!(url.is_absolute());
    ///
    /// let link = Url::parse("/contact?x=1").unwrap();
    /// assert!(link.is_relative());
    ///
    /// assert!(Url::parse("mailto:me@example.com").is_err());
    /// ```
    pub fn parse(input: &str) -> UrlResult<Self> {
        let raw = input.trim();

        if raw.is_empty() {
            return Err(invalid(input, "empty URL"));
        }

        if raw.chars().any(char::is_control) {
            return Err(invalid(input, "contains control characters"));
        }

        if raw.starts_with("//") {
            return Err(invalid(input, "protocol-relative URL has no scheme"));
        }

        match ::url::Url::parse(raw) {
            Ok(parsed) => {
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(UrlError::InvalidScheme(format!(
                        "Only HTTP and HTTPS schemes are supported, got: {}",
                        parsed.scheme()
                    )));
                }

                if parsed.host_str().map_or(true, str::is_empty) {
                    return Err(invalid(input, "missing host"));
                }

                Ok(Self::from_parts(raw.to_string(), Some(parsed)))
            }
            Err(::url::ParseError::RelativeUrlWithoutBase) => {
                Ok(Self::from_parts(raw.to_string(), None))
            }
            Err(e) => Err(invalid(input, &e.to_string())),
        }
    }

    fn from_parts(raw: String, parsed: Option<::url::Url>) -> Self {
        Self {
            raw,
            parsed,
            crawled: false,
            date_crawled: None,
            crawl_duration: None,
            redirects: Vec::new(),
        }
    }

    /// Copy of the address without any crawl metadata
    pub(crate) fn bare(&self) -> Self {
        Self::from_parts(self.raw.clone(), self.parsed.clone())
    }

    /// Returns the raw string form
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if the URL has a scheme and a host
    pub fn is_absolute(&self) -> bool {
        self.parsed.is_some()
    }

    /// Returns true if the URL has no host component
    pub fn is_relative(&self) -> bool {
        self.parsed.is_none()
    }

    /// Returns true if this link is relative with respect to `base`
    ///
    /// A link is relative when it has no host, or when its host equals the
    /// host of `base` (scheme and port are ignored). This is what decides
    /// whether a link stays inside a site crawl.
    ///
    /// # Errors
    ///
    /// Returns [`UrlError::Relative`] if `base` is itself relative.
    pub fn is_relative_to(&self, base: &Url) -> UrlResult<bool> {
        let base_host = base.to_host()?;
        match &self.parsed {
            None => Ok(true),
            Some(parsed) => Ok(parsed
                .host_str()
                .is_some_and(|host| host.eq_ignore_ascii_case(base_host))),
        }
    }

    // ===== Crawl bookkeeping =====

    /// Whether a fetch of this URL has been attempted
    pub fn crawled(&self) -> bool {
        self.crawled
    }

    /// When the last fetch attempt finished
    pub fn date_crawled(&self) -> Option<DateTime<Utc>> {
        self.date_crawled
    }

    /// Duration of the last fetch attempt in seconds
    pub fn crawl_duration(&self) -> Option<f64> {
        self.crawl_duration
    }

    /// Redirect hops recorded during the last resolution, `(from, to)` in order
    pub fn redirects(&self) -> &[(Url, Url)] {
        &self.redirects
    }

    /// The last URL in the redirect chain, if any redirect was followed
    pub fn redirect_target(&self) -> Option<&Url> {
        self.redirects.last().map(|(_, to)| to)
    }

    pub(crate) fn record_redirect(&mut self, from: Url, to: Url) {
        self.redirects.push((from, to));
    }

    pub(crate) fn clear_redirects(&mut self) {
        self.redirects.clear();
    }

    /// Marks the URL as crawled
    ///
    /// Failed fetches are marked too, so they are not retried straight away.
    pub fn mark_crawled(&mut self, success: bool, duration: Duration) {
        tracing::trace!("Marking {} crawled (success: {})", self.raw, success);
        self.crawled = true;
        self.date_crawled = Some(Utc::now());
        self.crawl_duration = Some(duration.as_secs_f64());
    }

    // ===== Field map contract =====

    /// Converts the URL into its stored field map
    ///
    /// Keys: `url`, `crawled`, `date_crawled` (RFC 3339), `crawl_duration`
    /// (seconds) and `redirects` (from → to, in hop order).
    pub fn to_field_map(&self) -> Map<String, Value> {
        let redirects: Map<String, Value> = self
            .redirects
            .iter()
            .map(|(from, to)| (from.raw.clone(), Value::String(to.raw.clone())))
            .collect();

        let mut map = Map::new();
        map.insert("url".to_string(), json!(self.raw));
        map.insert("crawled".to_string(), json!(self.crawled));
        map.insert(
            "date_crawled".to_string(),
            json!(self.date_crawled.map(|d| d.to_rfc3339())),
        );
        map.insert("crawl_duration".to_string(), json!(self.crawl_duration));
        map.insert("redirects".to_string(), Value::Object(redirects));
        map
    }

    /// Rebuilds a URL from a stored field map
    ///
    /// Only `url` is required. Unparseable timestamps and redirect entries
    /// are skipped.
    pub fn from_field_map(map: &Map<String, Value>) -> UrlResult<Self> {
        let raw = map
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("", "field map has no 'url' string"))?;

        let mut url = Self::parse(raw)?;
        url.crawled = map.get("crawled").and_then(Value::as_bool).unwrap_or(false);
        url.date_crawled = map
            .get("date_crawled")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));
        url.crawl_duration = map.get("crawl_duration").and_then(Value::as_f64);

        if let Some(redirects) = map.get("redirects").and_then(Value::as_object) {
            for (from, to) in redirects {
                let hop = to
                    .as_str()
                    .and_then(|to| Some((Self::parse(from).ok()?, Self::parse(to).ok()?)));
                if let Some((from, to)) = hop {
                    url.redirects.push((from, to));
                }
            }
        }

        Ok(url)
    }
}

fn invalid(url: &str, reason: &str) -> UrlError {
    UrlError::Invalid {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

impl PartialEq for Url {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Url {}

impl Hash for Url {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Url")
            .field("url", &self.raw)
            .field("crawled", &self.crawled)
            .field("redirects", &self.redirects.len())
            .finish()
    }
}

impl FromStr for Url {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Url {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}
