//! Per-traversal crawl state
//!
//! A [`CrawlState`] lives for one site crawl only. The crawled set only ever
//! grows and each batch is taken as its complement, so a traversal over a
//! cyclic site converges once every reachable path has been crawled.

use crate::url::Url;
use crate::CrawlError;
use glob::Pattern;
use std::collections::HashSet;

/// Key identifying a page within a site: path key plus query
fn crawl_key(url: &Url) -> String {
    match url.to_query() {
        Some(query) => format!("{}?{}", url.to_path(), query),
        None => url.to_path(),
    }
}

/// Keeps order, drops repeats
fn dedupe(urls: Vec<Url>) -> Vec<Url> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}

/// Visited set, pending internal links and discovered external links
#[derive(Debug, Default)]
pub(crate) struct CrawlState {
    crawled: HashSet<String>,
    internal: Vec<Url>,
    external: Vec<Url>,
}

impl CrawlState {
    /// Starts a traversal whose seed page has been crawled
    ///
    /// The seed's bare path is marked too, so a seed carrying a query does
    /// not cause its path to be fetched again.
    pub fn new(seed: &Url) -> Self {
        let mut state = Self::default();
        state.mark_crawled(seed);
        state.crawled.insert(seed.to_path());
        state
    }

    pub fn mark_crawled(&mut self, url: &Url) {
        self.crawled.insert(crawl_key(url));
    }

    pub fn is_crawled(&self, url: &Url) -> bool {
        self.crawled.contains(&crawl_key(url))
    }

    pub fn crawled_count(&self) -> usize {
        self.crawled.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.internal.is_empty()
    }

    /// Queues links found on a crawled page
    pub fn extend(&mut self, internal: Vec<Url>, external: Vec<Url>) {
        self.internal.extend(internal);
        self.external.extend(external);
    }

    /// Takes every pending link that has not been crawled, deduplicated
    pub fn next_batch(&mut self) -> Vec<Url> {
        let pending = std::mem::take(&mut self.internal);
        dedupe(pending)
            .into_iter()
            .filter(|link| !self.is_crawled(link))
            .collect()
    }

    /// The external links found, deduplicated in discovery order
    pub fn into_external(self) -> Vec<Url> {
        dedupe(self.external)
    }
}

/// Allow/disallow glob filters on a link's path key
#[derive(Debug, Default)]
pub(crate) struct PathFilter {
    allow: Vec<Pattern>,
    disallow: Vec<Pattern>,
}

impl PathFilter {
    /// Compiles both pattern lists
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidPattern`] for the first pattern that
    /// does not compile.
    pub fn new(allow: &[String], disallow: &[String]) -> Result<Self, CrawlError> {
        Ok(Self {
            allow: compile_patterns(allow)?,
            disallow: compile_patterns(disallow)?,
        })
    }

    /// True if the link passes the allow list (when set) and no disallow pattern
    pub fn permits(&self, link: &Url) -> bool {
        let path = link.to_path();
        let allowed = self.allow.is_empty() || self.allow.iter().any(|p| p.matches(&path));
        allowed && !self.disallow.iter().any(|p| p.matches(&path))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, CrawlError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|e| CrawlError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}
