//! Document module
//!
//! A [`Document`] is the structured record produced for every crawled page:
//! the page [`Url`], its raw HTML and the field map built by the extractor
//! registry. Documents are built either from a fresh fetch or from a stored
//! field map; both paths expose the same fields.

mod search;

pub use search::SearchOptions;

use crate::crawler::FetchError;
use crate::extract::{
    is_crawlable_link, CompiledSelector, ExtractError, ExtractorRegistry, Source, SourceKind,
};
use crate::url::Url;
use crate::UrlError;
use scraper::Html;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while building a document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Stored record has no 'url' field")]
    MissingUrl,
}

/// What a document is built from
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// A fetched page: its absolute URL and raw HTML
    FromHtml { url: Url, html: String },

    /// A previously stored field map (see [`Document::to_field_map`])
    FromStored(Map<String, Value>),
}

/// A crawled page and the fields extracted from it
#[derive(Debug, Clone)]
pub struct Document {
    url: Url,
    html: Option<String>,
    fields: Map<String, Value>,
    score: f64,
    kind: SourceKind,
    fetch_error: Option<FetchError>,
}

impl Document {
    /// Builds a document from either source kind
    ///
    /// # Arguments
    ///
    /// * `source` - Fetched HTML or a stored field map
    /// * `registry` - The extractors to run
    ///
    /// # Returns
    ///
    /// * `Ok(Document)` - Fields extracted
    /// * `Err(DocumentError)` - Invalid URL, or an extractor failed
    pub fn new(source: DocumentSource, registry: &ExtractorRegistry) -> Result<Self, DocumentError> {
        match source {
            DocumentSource::FromHtml { url, html } => Self::from_html(url, html, registry),
            DocumentSource::FromStored(map) => Self::from_stored(map, registry),
        }
    }

    /// Parses `html` and runs every extractor against it
    ///
    /// The URL must be absolute since it is the base for link partitioning.
    pub fn from_html(
        url: Url,
        html: impl Into<String>,
        registry: &ExtractorRegistry,
    ) -> Result<Self, DocumentError> {
        if url.is_relative() {
            return Err(UrlError::Relative(url.to_string()).into());
        }

        let html = html.into();
        let fields = {
            let parsed = Html::parse_document(&html);
            registry.run_all(&Source::Html(&parsed))?
        };

        tracing::trace!("Extracted {} fields from {}", fields.len(), url);

        Ok(Self {
            url,
            html: Some(html),
            fields,
            score: 0.0,
            kind: SourceKind::Html,
            fetch_error: None,
        })
    }

    /// Rebuilds a document from a stored field map
    ///
    /// `url` may be a plain string or a nested Url field map. Stored values
    /// take precedence; extractors only run for fields the map lacks.
    /// `score` defaults to 0.0.
    pub fn from_stored(map: Map<String, Value>, registry: &ExtractorRegistry) -> Result<Self, DocumentError> {
        let url = match map.get("url") {
            Some(Value::String(raw)) => Url::parse(raw)?,
            Some(Value::Object(record)) => Url::from_field_map(record)?,
            _ => return Err(DocumentError::MissingUrl),
        };

        let fields = registry.run_missing(&map)?;
        let score = map.get("score").and_then(Value::as_f64).unwrap_or(0.0);
        let html = map.get("html").and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            url,
            html,
            fields,
            score,
            kind: SourceKind::Stored,
            fetch_error: None,
        })
    }

    /// A document with no content, for a page that was skipped or unusable
    pub fn empty(url: Url) -> Self {
        Self {
            url,
            html: None,
            fields: Map::new(),
            score: 0.0,
            kind: SourceKind::Html,
            fetch_error: None,
        }
    }

    /// An empty document recording why the fetch failed
    pub fn failed(url: Url, error: FetchError) -> Self {
        Self {
            fetch_error: Some(error),
            ..Self::empty(url)
        }
    }

    // ===== Accessors =====

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = score;
    }

    /// Which kind of source the fields came from
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Why the fetch failed, for documents built from a failed fetch
    pub fn fetch_error(&self) -> Option<&FetchError> {
        self.fetch_error.as_ref()
    }

    /// Returns the value of an extracted field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    fn get_strs(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.get_str("description")
    }

    pub fn author(&self) -> Option<&str> {
        self.get_str("author")
    }

    pub fn base(&self) -> Option<&str> {
        self.get_str("base")
    }

    pub fn keywords(&self) -> Vec<&str> {
        self.get_strs("keywords")
    }

    /// The visible text sentences
    pub fn text(&self) -> Vec<&str> {
        self.get_strs("text")
    }

    /// True when there is no usable content
    ///
    /// An HTML document is empty when its HTML is missing or blank; a stored
    /// one when every field is null or empty.
    pub fn is_empty(&self) -> bool {
        match self.kind {
            SourceKind::Html => self.html.as_deref().map_or(true, |html| html.trim().is_empty()),
            SourceKind::Stored => self.fields.values().all(is_blank_value),
        }
    }

    // ===== Links =====

    /// The discovered links, protocol-relative ones given the page's scheme
    pub fn links(&self) -> Vec<Url> {
        let hrefs = self.get_strs("links");
        self.parse_links(hrefs)
    }

    fn parse_links<'a>(&self, hrefs: impl IntoIterator<Item = &'a str>) -> Vec<Url> {
        let served = self.served_url();
        let scheme = served.to_scheme().ok();
        hrefs
            .into_iter()
            .filter_map(|href| match (href.strip_prefix("//"), scheme) {
                (Some(rest), Some(scheme)) => Url::parse(&format!("{}://{}", scheme, rest)).ok(),
                (Some(_), None) => None,
                (None, _) => Url::parse(href).ok(),
            })
            .collect()
    }

    /// The address that served the HTML: the redirect target, if any
    fn served_url(&self) -> Url {
        self.url.redirect_target().unwrap_or(&self.url).bare()
    }

    /// The serving URL, or the `<base href>` override resolved against it
    ///
    /// After a redirect, relative links resolve against the redirect target
    /// while [`Document::url`] stays the requested address.
    pub fn base_url(&self) -> Url {
        let served = self.served_url();
        self.base()
            .and_then(|base| served.join(base).ok())
            .unwrap_or(served)
    }

    /// Splits links into internal (root-relative) and external URLs
    ///
    /// Internal links are resolved against [`Document::base_url`] and
    /// returned as `/path?query`, without fragment. Fragment-only links are
    /// dropped. Both lists are deduplicated, keeping discovery order.
    fn partition(&self, links: Vec<Url>) -> (Vec<Url>, Vec<Url>) {
        let served = self.served_url();
        let base = self.base_url();
        let mut internal = Vec::new();
        let mut external = Vec::new();
        let mut seen = HashSet::new();

        for link in links {
            let Ok(is_internal) = link.is_relative_to(&served) else {
                continue;
            };

            if !is_internal {
                if seen.insert(link.as_str().to_string()) {
                    external.push(link);
                }
                continue;
            }

            if link.is_relative() && link.as_str().starts_with('#') {
                continue;
            }

            let resolved = base.join(link.as_str()).ok();
            let Some(path) = resolved.as_ref().and_then(root_relative) else {
                tracing::debug!("Skipping unresolvable link {} on {}", link, self.url);
                continue;
            };
            if seen.insert(path.as_str().to_string()) {
                internal.push(path);
            }
        }

        (internal, external)
    }

    /// Links on the same host as the page, as root-relative URLs
    pub fn internal_links(&self) -> Vec<Url> {
        self.partition(self.links()).0
    }

    /// Links to other hosts
    pub fn external_links(&self) -> Vec<Url> {
        self.partition(self.links()).1
    }

    /// Internal links resolved to absolute URLs against [`Document::base_url`]
    pub fn internal_absolute_links(&self) -> Vec<Url> {
        let base = self.base_url();
        self.internal_links()
            .iter()
            .filter_map(|link| base.join(link.as_str()).ok())
            .collect()
    }

    /// Partitions the links addressed by a follow selector
    ///
    /// Runs `follow` against the stored HTML, keeping the same crawlable
    /// links the default `links` field keeps. Without HTML, falls back to
    /// the `links` field.
    pub fn select_links(&self, follow: &CompiledSelector) -> (Vec<Url>, Vec<Url>) {
        let Some(html) = &self.html else {
            return self.partition(self.links());
        };

        let hrefs = {
            let parsed = Html::parse_document(html);
            follow.select(&parsed, true)
        };
        let crawlable = hrefs
            .iter()
            .map(String::as_str)
            .filter(|href| is_crawlable_link(href));
        let links = self.parse_links(crawlable);
        self.partition(links)
    }

    // ===== Search =====

    /// Searches the visible text and returns ranked snippets
    ///
    /// Sentences with more hits come first; ties keep document order. Each
    /// snippet is cut to `sentence_limit` characters around its first hit.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<String> {
        search::search_sentences(self.text(), query, options)
    }

    /// Replaces the `text` field with the result of [`Document::search`]
    pub fn search_in_place(&mut self, query: &str, options: &SearchOptions) -> Vec<String> {
        let snippets = self.search(query, options);
        self.fields.insert("text".to_string(), json!(snippets));
        snippets
    }

    // ===== Field map contract =====

    /// Converts the document into its stored field map
    ///
    /// Keys: `url`, every extracted field, and `score`.
    pub fn to_field_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("url".to_string(), json!(self.url.as_str()));
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.clone());
        }
        map.insert("score".to_string(), json!(self.score));
        map
    }
}

/// `https://host/a/b?q#f` as `/a/b?q`
fn root_relative(absolute: &Url) -> Option<Url> {
    let path = absolute.omit_base().without_anchor();
    let raw = path.as_str();
    let raw = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    };
    Url::parse(&raw).ok()
}

fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
