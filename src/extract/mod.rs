//! Field extraction module
//!
//! This module turns a page into named fields:
//! - [`Extractor`]: a named rule (selector, cardinality, optional transform)
//! - [`ExtractorRegistry`]: the shared table of rules run for every document
//! - [`extract_text`]: the HTML to visible-text algorithm behind the `text` field
//!
//! Every extractor can run against either a parsed HTML tree or a stored field
//! map, so a document rebuilt from storage exposes the same fields as one
//! built from a fresh fetch.

mod defaults;
mod registry;
mod selector;
mod text;

pub use defaults::default_extractors;
pub(crate) use defaults::is_crawlable_link;
pub use registry::ExtractorRegistry;
pub use selector::{CompiledSelector, Selector};
pub use text::{display_of, extract_text, Display};

use scraper::Html;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error type returned by caller-authored transforms
pub type TransformError = Box<dyn std::error::Error + Send + Sync>;

/// A transform hook: `(value, source, source_kind) -> replacement`
///
/// Returning `Ok(None)` keeps the extracted value, which lets a transform act
/// as a validator only.
pub type Transform = Arc<
    dyn Fn(&Value, &Source<'_>, SourceKind) -> Result<Option<Value>, TransformError> + Send + Sync,
>;

/// Errors that can occur while defining or running extractors
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid extractor name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Transform for extractor '{name}' failed: {source}")]
    Transform {
        name: String,
        #[source]
        source: TransformError,
    },
}

/// What an extractor is evaluated against
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// A parsed HTML document
    Html(&'a Html),

    /// A previously stored field map
    Stored(&'a Map<String, Value>),
}

impl Source<'_> {
    /// Returns the kind tag of this source
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Html(_) => SourceKind::Html,
            Self::Stored(_) => SourceKind::Stored,
        }
    }
}

/// Tag describing the kind of a [`Source`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Html,
    Stored,
}

/// A named rule for deriving one document field
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use webcrawl::extract::{Extractor, ExtractorRegistry, Source, SourceKind};
///
/// let registry = ExtractorRegistry::new();
/// registry
///     .define(
///         Extractor::new("price", "span.price").transform(|value, _source, kind| {
///             if kind != SourceKind::Html {
///                 return Ok(None);
///             }
///             let parsed = value
///                 .as_str()
///                 .and_then(|s| s.trim_start_matches('$').parse::<f64>().ok());
///             Ok(parsed.map(|p| json!(p)))
///         }),
///     )
///     .unwrap();
///
/// let html = scraper::Html::parse_document(r#"<span class="price">$9.50</span>"#);
/// let fields = registry.run_all(&Source::Html(&html)).unwrap();
/// assert_eq!(fields["price"], json!(9.5));
/// ```
#[derive(Clone)]
pub struct Extractor {
    name: String,
    selector: Selector,
    compiled: Option<Arc<CompiledSelector>>,
    singleton: bool,
    text_content_only: bool,
    transform: Option<Transform>,
}

impl Extractor {
    /// Creates a singleton, text-content extractor
    pub fn new(name: impl Into<String>, selector: impl Into<Selector>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            compiled: None,
            singleton: true,
            text_content_only: true,
            transform: None,
        }
    }

    /// Sets whether the extractor yields one value (or null) instead of a list
    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    /// Sets whether matches yield their text instead of their markup
    pub fn text_content_only(mut self, text_content_only: bool) -> Self {
        self.text_content_only = text_content_only;
        self
    }

    /// Attaches a transform run after selection
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Source<'_>, SourceKind) -> Result<Option<Value>, TransformError>
            + Send
            + Sync
            + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn is_text_content_only(&self) -> bool {
        self.text_content_only
    }

    /// Compiles a static expression ahead of use
    pub(crate) fn compile(&mut self) -> Result<(), ExtractError> {
        if let Selector::Expr(expr) = &self.selector {
            self.compiled = Some(Arc::new(CompiledSelector::parse(expr)?));
        }
        Ok(())
    }

    /// The value this extractor produces when nothing matches
    pub fn empty_value(&self) -> Value {
        if self.singleton {
            Value::Null
        } else {
            Value::Array(Vec::new())
        }
    }

    /// Evaluates the extractor against a source
    ///
    /// Singleton extractors yield the first match or null; the others yield
    /// every match or an empty list, never null. A stored source yields the
    /// raw stored value. A transform error is returned as-is, wrapped with
    /// the extractor name.
    pub fn extract(&self, source: &Source<'_>) -> Result<Value, ExtractError> {
        let value = match source {
            Source::Html(html) => self.select_html(html)?,
            Source::Stored(map) => match map.get(&self.name) {
                Some(value) if !value.is_null() => value.clone(),
                _ => self.empty_value(),
            },
        };

        let Some(transform) = &self.transform else {
            return Ok(value);
        };

        tracing::trace!("Running transform for extractor '{}'", self.name);
        match transform(&value, source, source.kind()) {
            Ok(Some(replacement)) => Ok(replacement),
            Ok(None) => Ok(value),
            Err(source) => Err(ExtractError::Transform {
                name: self.name.clone(),
                source,
            }),
        }
    }

    fn select_html(&self, html: &Html) -> Result<Value, ExtractError> {
        let matches = match (&self.selector, &self.compiled) {
            (Selector::None, _) => Vec::new(),
            (Selector::Expr(_), Some(compiled)) => compiled.select(html, self.text_content_only),
            (Selector::Expr(expr), None) => {
                CompiledSelector::parse(expr)?.select(html, self.text_content_only)
            }
            (Selector::Deferred(make), _) => {
                CompiledSelector::parse(&make())?.select(html, self.text_content_only)
            }
        };

        let value = if self.singleton {
            matches.into_iter().next().map_or(Value::Null, Value::String)
        } else {
            Value::Array(matches.into_iter().map(Value::String).collect())
        };
        Ok(value)
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .field("singleton", &self.singleton)
            .field("text_content_only", &self.text_content_only)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}
