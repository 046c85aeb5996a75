//! Crawl engine - page and site crawl orchestration
//!
//! This module ties the pieces together:
//! - Consulting the robots gate before each fetch
//! - Resolving and fetching through the [`Resolver`]
//! - Turning responses into [`Document`]s (empty ones for failures)
//! - Walking every internal link of a site exactly once

use super::resolver::{FetchError, ResolveOptions, Resolver};
use super::state::{CrawlState, PathFilter};
use super::transport::{ReqwestTransport, Response, Transport};
use crate::config::{Config, CrawlerConfig, SiteConfig};
use crate::document::Document;
use crate::extract::{CompiledSelector, ExtractorRegistry};
use crate::robots::RobotsGate;
use crate::url::Url;
use crate::{ConfigError, Result, UrlError};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Selector for the links a site crawl follows by default
pub const DEFAULT_FOLLOW: &str = "a@href";

/// Link selection and path filters for a site crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteOptions {
    /// Selector expression addressing the hrefs to follow
    pub follow: String,

    /// Glob patterns on the path key; when set, a link must match one
    pub allow_paths: Vec<String>,

    /// Glob patterns on the path key; a matching link is never crawled
    pub disallow_paths: Vec<String>,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            follow: DEFAULT_FOLLOW.to_string(),
            allow_paths: Vec::new(),
            disallow_paths: Vec::new(),
        }
    }
}

impl From<&SiteConfig> for SiteOptions {
    fn from(config: &SiteConfig) -> Self {
        Self {
            follow: config.follow.clone(),
            allow_paths: config.allow_paths.clone(),
            disallow_paths: config.disallow_paths.clone(),
        }
    }
}

impl TryFrom<&CrawlerConfig> for ResolveOptions {
    type Error = ConfigError;

    fn try_from(config: &CrawlerConfig) -> std::result::Result<Self, Self::Error> {
        let timeout = Duration::try_from_secs_f64(config.timeout_secs).map_err(|e| {
            ConfigError::Validation(format!("timeout-secs {}: {}", config.timeout_secs, e))
        })?;

        Ok(Self {
            redirect_limit: config.redirect_limit,
            follow_external_redirects: config.follow_external_redirects,
            domain: config.domain.clone(),
            timeout,
        })
    }
}

/// Crawls single pages, lists of pages and whole sites
///
/// Every crawl is sequential: one fetch completes before the next starts.
/// The extractor registry is shared; everything else about a traversal is
/// local to the call.
pub struct CrawlEngine<T = ReqwestTransport> {
    resolver: Resolver<T>,
    registry: Arc<ExtractorRegistry>,
    robots: Option<Arc<dyn RobotsGate>>,
    options: ResolveOptions,
}

impl CrawlEngine<ReqwestTransport> {
    /// Creates an engine on a `reqwest` client built from the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated crawler configuration
    /// * `registry` - The extractors every document runs
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlEngine)` - Engine ready to crawl
    /// * `Err(CrawlError)` - The timeout is not a valid duration, or the
    ///   HTTP client could not be built
    pub fn from_config(config: &Config, registry: Arc<ExtractorRegistry>) -> Result<Self> {
        let options = ResolveOptions::try_from(&config.crawler)?;
        let transport = ReqwestTransport::from_config(&config.user_agent)?;
        Ok(Self::new(transport, registry).with_resolve_options(options))
    }
}

impl<T: Transport> CrawlEngine<T> {
    pub fn new(transport: T, registry: Arc<ExtractorRegistry>) -> Self {
        Self {
            resolver: Resolver::new(transport),
            registry,
            robots: None,
            options: ResolveOptions::default(),
        }
    }

    /// Sets the redirect policy and timeout used by `crawl_url`
    pub fn with_resolve_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Installs a gate consulted before every fetch
    pub fn with_robots<G: RobotsGate + 'static>(mut self, gate: G) -> Self {
        self.robots = Some(Arc::new(gate));
        self
    }

    /// Installs the resolver's per-response observer
    pub fn with_redirect_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Url, &Response, Option<&Url>) + Send + Sync + 'static,
    {
        self.resolver = self.resolver.with_observer(observer);
        self
    }

    pub fn registry(&self) -> &Arc<ExtractorRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &Resolver<T> {
        &self.resolver
    }

    pub fn resolve_options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Crawls a single page
    ///
    /// Network failures, redirect policy violations, non-2xx responses and
    /// non-HTML content all yield an empty document; a fetch failure is kept
    /// on it (see [`Document::fetch_error`]). The URL is marked crawled in
    /// every case except a robots skip, which returns an empty document
    /// without fetching.
    ///
    /// # Errors
    ///
    /// Only contract errors: a relative URL, or an extractor failure.
    pub async fn crawl_url(&self, url: Url) -> Result<Document> {
        self.crawl_with(url, &self.options).await
    }

    async fn crawl_with(&self, mut url: Url, options: &ResolveOptions) -> Result<Document> {
        if url.is_relative() {
            return Err(UrlError::Relative(url.to_string()).into());
        }

        if let Some(robots) = &self.robots {
            if !robots.allowed(&url) {
                tracing::info!("URL {} disallowed by robots.txt", url);
                return Ok(Document::empty(url));
            }
        }

        let started = Instant::now();
        let result = self.resolver.resolve(&mut url, options).await;
        let elapsed = started.elapsed();

        match result {
            Ok(response) if response.is_success() && response.is_html() => {
                url.mark_crawled(true, elapsed);
                tracing::info!(
                    "Crawled {} ({} bytes in {:.2}s)",
                    url,
                    response.body.len(),
                    elapsed.as_secs_f64()
                );
                Ok(Document::from_html(url, response.text(), &self.registry)?)
            }
            Ok(response) => {
                url.mark_crawled(false, elapsed);
                if response.is_success() {
                    tracing::debug!(
                        "Skipping non-HTML content at {} ({})",
                        url,
                        response.content_type().unwrap_or("unknown")
                    );
                } else {
                    tracing::warn!("{} returned status {}", url, response.status);
                }
                Ok(Document::empty(url))
            }
            Err(FetchError::Url(e)) => Err(e.into()),
            Err(e) => {
                url.mark_crawled(false, elapsed);
                tracing::warn!("Failed to fetch {}: {}", url, e);
                Ok(Document::failed(url, e))
            }
        }
    }

    /// Crawls each URL in order, handing every document to `observer`
    ///
    /// Only the last document is kept, so arbitrarily long lists run in
    /// constant memory. Returns `None` for an empty list.
    pub async fn crawl_urls<I, F>(&self, urls: I, mut observer: F) -> Result<Option<Document>>
    where
        I: IntoIterator<Item = Url>,
        F: FnMut(&Document),
    {
        let mut last = None;
        for url in urls {
            let document = self.crawl_url(url).await?;
            observer(&document);
            last = Some(document);
        }
        Ok(last)
    }

    /// Crawls every internal page reachable from `base`
    ///
    /// Each internal path is crawled at most once, so the traversal ends on
    /// cyclic sites. Internal pages are fetched with external redirects
    /// denied. Every successfully crawled page, the seed included, is handed
    /// to `observer`.
    ///
    /// # Arguments
    ///
    /// * `base` - Absolute seed URL
    /// * `options` - Follow selector and path filters
    /// * `observer` - Receives each crawled document
    ///
    /// # Returns
    ///
    /// * `Ok(Some(externals))` - External links found, deduplicated
    /// * `Ok(None)` - The seed page was unreachable or empty
    /// * `Err(CrawlError)` - Relative seed, bad selector or glob pattern, or
    ///   an extractor failure
    pub async fn crawl_site<F>(&self, base: Url, options: &SiteOptions, mut observer: F) -> Result<Option<Vec<Url>>>
    where
        F: FnMut(&Document),
    {
        let site = base.to_base()?;
        let host = base.to_host()?.to_string();
        let follow = CompiledSelector::parse(&options.follow)?;
        let filter = PathFilter::new(&options.allow_paths, &options.disallow_paths)?;

        let internal_options = ResolveOptions {
            follow_external_redirects: false,
            domain: Some(self.options.domain.clone().unwrap_or_else(|| host.clone())),
            ..self.options.clone()
        };

        tracing::info!("Starting site crawl at {}", base);

        let seed = self.crawl_url(base).await?;
        if seed.is_empty() {
            tracing::warn!("Site {} is unreachable", seed.url());
            return Ok(None);
        }

        let mut state = CrawlState::new(seed.url());
        mark_redirect_target(&mut state, &seed, &host);
        let (internal, external) = seed.select_links(&follow);
        state.extend(internal, external);
        observer(&seed);

        while state.has_pending() {
            let batch = state.next_batch();
            tracing::debug!("Crawling batch of {} links on {}", batch.len(), site);

            for link in batch {
                if state.is_crawled(&link) {
                    continue;
                }
                state.mark_crawled(&link);

                if !filter.permits(&link) {
                    tracing::debug!("Skipping {} (path filter)", link);
                    continue;
                }

                let document = self.crawl_with(site.concat(&link)?, &internal_options).await?;
                mark_redirect_target(&mut state, &document, &host);
                if document.is_empty() {
                    continue;
                }

                let (internal, external) = document.select_links(&follow);
                state.extend(internal, external);
                observer(&document);
            }
        }

        let crawled = state.crawled_count();
        let external = state.into_external();
        tracing::info!(
            "Site crawl of {} complete: {} paths visited, {} external links",
            site,
            crawled,
            external.len()
        );

        Ok(Some(external))
    }
}

/// Marks the page a redirect landed on, when it is on the crawled site
fn mark_redirect_target(state: &mut CrawlState, document: &Document, host: &str) {
    if let Some(target) = document.url().redirect_target() {
        if target.to_host().is_ok_and(|h| h.eq_ignore_ascii_case(host)) {
            state.mark_crawled(target);
        }
    }
}

impl<T> fmt::Debug for CrawlEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlEngine")
            .field("resolver", &self.resolver)
            .field("registry", &self.registry)
            .field("robots", &self.robots.is_some())
            .field("options", &self.options)
            .finish()
    }
}
