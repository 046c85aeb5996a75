//! Redirect-following URL resolver
//!
//! The transport never follows redirects, so every hop passes through
//! [`Resolver::resolve`], which enforces the hop limit and the cross-domain
//! policy and records the chain on the [`Url`].

use super::transport::{Response, Transport, TransportError};
use crate::url::{matches_wildcard, Url};
use crate::UrlError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default maximum number of redirect hops
pub const DEFAULT_REDIRECT_LIMIT: usize = 5;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a URL could not be fetched
///
/// Cloneable so an empty [`Document`](crate::Document) can keep it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Too many redirects from {url} (limit {limit})")]
    TooManyRedirects { url: String, limit: usize },

    #[error("Redirect from {from} to {to} leaves domain {domain}")]
    ExternalRedirectDenied {
        from: String,
        to: String,
        domain: String,
    },

    #[error("Invalid redirect location '{location}' from {url}")]
    InvalidLocation { url: String, location: String },

    #[error("Network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Url(#[from] UrlError),
}

/// Redirect policy for one resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    /// Maximum number of hops to follow
    pub redirect_limit: usize,

    /// Whether a redirect may leave `domain`
    pub follow_external_redirects: bool,

    /// Allowed domain pattern (`example.com` or `*.example.com`); defaults to
    /// the host of the URL being resolved
    pub domain: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
            follow_external_redirects: true,
            domain: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Called for every response: `(url, response, next_location)`
///
/// `next_location` is the resolved redirect target, or `None` for the final
/// response.
pub type RedirectObserver = Arc<dyn Fn(&Url, &Response, Option<&Url>) + Send + Sync>;

/// Fetches URLs through a [`Transport`], following redirects by hand
pub struct Resolver<T> {
    transport: T,
    observer: Option<RedirectObserver>,
}

impl<T: Transport> Resolver<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            observer: None,
        }
    }

    /// Installs the per-response observer
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Url, &Response, Option<&Url>) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn notify(&self, url: &Url, response: &Response, next: Option<&Url>) {
        if let Some(observer) = &self.observer {
            observer(url, response, next);
        }
    }

    /// Fetches `url`, following redirects
    ///
    /// Each followed hop is recorded on `url` as `(from, to)`; previously
    /// recorded hops are cleared first. A redirect without a `Location`
    /// header is returned as the final response.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to fetch; receives the redirect history
    /// * `options` - Hop limit, domain policy and timeout
    ///
    /// # Returns
    ///
    /// * `Ok(Response)` - The first non-redirect response
    /// * `Err(FetchError)` - Network failure or redirect policy violation;
    ///   hops recorded before the failure are kept
    pub async fn resolve(&self, url: &mut Url, options: &ResolveOptions) -> Result<Response, FetchError> {
        let domain = match &options.domain {
            Some(domain) => domain.clone(),
            None => url.to_host()?.to_string(),
        };

        url.clear_redirects();
        let mut current = url.bare();
        let mut hops = 0;

        loop {
            let response = self
                .transport
                .get(&current, options.timeout)
                .await
                .map_err(|source| FetchError::Network {
                    url: current.to_string(),
                    source,
                })?;

            let location = match response.location() {
                Some(location) if response.is_redirect() => location,
                _ => {
                    self.notify(&current, &response, None);
                    return Ok(response);
                }
            };

            let target = current
                .join(location)
                .map_err(|_| FetchError::InvalidLocation {
                    url: current.to_string(),
                    location: location.to_string(),
                })?;

            self.notify(&current, &response, Some(&target));

            hops += 1;
            if hops > options.redirect_limit {
                tracing::debug!("Redirect limit {} reached for {}", options.redirect_limit, url);
                return Err(FetchError::TooManyRedirects {
                    url: url.to_string(),
                    limit: options.redirect_limit,
                });
            }

            if !options.follow_external_redirects && !matches_wildcard(&domain, target.to_host()?) {
                tracing::debug!("Denied redirect {} -> {} outside {}", current, target, domain);
                return Err(FetchError::ExternalRedirectDenied {
                    from: current.to_string(),
                    to: target.to_string(),
                    domain,
                });
            }

            tracing::debug!("Redirect {} -> {} ({})", current, target, response.status);
            url.record_redirect(current, target.clone());
            current = target;
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::StubTransport;
    use crate::crawler::transport::TransportErrorKind;
    use std::sync::Mutex;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    /// `/r0 -> /r1 -> ... -> /r{n-1} -> /final`
    fn chain(n: usize) -> StubTransport {
        let mut transport = StubTransport::new();
        for i in 0..n {
            let next = if i + 1 == n {
                "/final".to_string()
            } else {
                format!("/r{}", i + 1)
            };
            transport = transport.redirect(&format!("https://a.com/r{}", i), &next);
        }
        transport.page("https://a.com/final", "<p>done</p>")
    }

    fn with_limit(limit: usize) -> ResolveOptions {
        ResolveOptions {
            redirect_limit: limit,
            ..ResolveOptions::default()
        }
    }

    #[tokio::test]
    async fn test_no_redirect() {
        let resolver = Resolver::new(StubTransport::new().page("https://a.com/", "<p>hi</p>"));
        let mut target = url("https://a.com/");
        let response = resolver.resolve(&mut target, &ResolveOptions::default()).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(target.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_chain_within_limit() {
        let resolver = Resolver::new(chain(3));
        let mut start = url("https://a.com/r0");
        let response = resolver.resolve(&mut start, &with_limit(3)).await.unwrap();

        assert_eq!(response.url, "https://a.com/final");
        let hops: Vec<(&str, &str)> = start
            .redirects()
            .iter()
            .map(|(from, to)| (from.as_str(), to.as_str()))
            .collect();
        assert_eq!(
            hops,
            vec![
                ("https://a.com/r0", "https://a.com/r1"),
                ("https://a.com/r1", "https://a.com/r2"),
                ("https://a.com/r2", "https://a.com/final"),
            ]
        );
        assert_eq!(start.redirect_target().map(Url::as_str), Some("https://a.com/final"));
    }

    #[tokio::test]
    async fn test_chain_over_limit() {
        let resolver = Resolver::new(chain(3));
        let mut start = url("https://a.com/r0");
        let err = resolver.resolve(&mut start, &with_limit(2)).await.unwrap_err();

        assert_eq!(
            err,
            FetchError::TooManyRedirects {
                url: "https://a.com/r0".to_string(),
                limit: 2,
            }
        );
        assert_eq!(start.redirects().len(), 2);
        assert_eq!(start.redirect_target().map(Url::as_str), Some("https://a.com/r2"));
    }

    #[tokio::test]
    async fn test_redirect_loop_terminates() {
        let transport = StubTransport::new()
            .redirect("https://a.com/x", "/y")
            .redirect("https://a.com/y", "/x");
        let resolver = Resolver::new(transport);
        let mut start = url("https://a.com/x");
        let err = resolver.resolve(&mut start, &ResolveOptions::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::TooManyRedirects { limit: 5, .. }));
        assert_eq!(resolver.transport().requests().len(), 6);
    }

    #[tokio::test]
    async fn test_external_redirect_policy() {
        let transport = StubTransport::new()
            .redirect("https://a.com/", "https://b.com/landing")
            .page("https://b.com/landing", "<p>b</p>");
        let resolver = Resolver::new(transport);

        let mut followed = url("https://a.com/");
        let response = resolver.resolve(&mut followed, &ResolveOptions::default()).await.unwrap();
        assert_eq!(response.url, "https://b.com/landing");

        let denied = ResolveOptions {
            follow_external_redirects: false,
            ..ResolveOptions::default()
        };
        let mut blocked = url("https://a.com/");
        let err = resolver.resolve(&mut blocked, &denied).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::ExternalRedirectDenied {
                from: "https://a.com/".to_string(),
                to: "https://b.com/landing".to_string(),
                domain: "a.com".to_string(),
            }
        );
        assert!(blocked.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_wildcard_domain_allows_subdomains() {
        let transport = StubTransport::new()
            .redirect("https://a.com/", "https://www.a.com/")
            .page("https://www.a.com/", "<p>www</p>");
        let resolver = Resolver::new(transport);
        let options = ResolveOptions {
            follow_external_redirects: false,
            domain: Some("*.a.com".to_string()),
            ..ResolveOptions::default()
        };

        let mut start = url("https://a.com/");
        let response = resolver.resolve(&mut start, &options).await.unwrap();
        assert_eq!(response.url, "https://www.a.com/");
    }

    #[tokio::test]
    async fn test_network_error_is_typed() {
        let resolver = Resolver::new(StubTransport::new());
        let mut missing = url("https://nowhere.test/");
        let err = resolver.resolve(&mut missing, &ResolveOptions::default()).await.unwrap_err();
        match err {
            FetchError::Network { url, source } => {
                assert_eq!(url, "https://nowhere.test/");
                assert_eq!(source.kind, TransportErrorKind::Connect);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_relative_url_rejected() {
        let resolver = Resolver::new(StubTransport::new());
        let mut relative = url("/about");
        let err = resolver.resolve(&mut relative, &ResolveOptions::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::Url(UrlError::Relative(_))));
    }

    #[tokio::test]
    async fn test_observer_sees_every_hop() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let resolver = Resolver::new(chain(2)).with_observer(move |url, response, next| {
            log.lock().unwrap().push((
                url.to_string(),
                response.status,
                next.map(|n| n.to_string()),
            ));
        });

        let mut start = url("https://a.com/r0");
        resolver.resolve(&mut start, &ResolveOptions::default()).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("https://a.com/r0".to_string(), 302, Some("https://a.com/r1".to_string())),
                ("https://a.com/r1".to_string(), 302, Some("https://a.com/final".to_string())),
                ("https://a.com/final".to_string(), 200, None),
            ]
        );
    }
}
