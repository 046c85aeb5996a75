//! Selector expressions used by extractors
//!
//! An expression is a CSS selector, optionally followed by `@attribute` to
//! address an attribute of the matched elements instead of their content:
//!
//! | expression | yields |
//! |------------|--------|
//! | `title` | text of `<title>` |
//! | `a@href` | `href` of every anchor |
//! | `meta[name='author']@content` | `content` of the author meta tag |

use super::ExtractError;
use scraper::Html;
use std::fmt;
use std::sync::Arc;

/// Where an extractor looks for its value
#[derive(Clone)]
pub enum Selector {
    /// Matches nothing; the value comes entirely from the transform
    None,

    /// A static expression, compiled when the extractor is defined
    Expr(String),

    /// An expression produced at use time, compiled on every evaluation
    Deferred(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Selector {
    /// Creates a deferred selector from a closure
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(f))
    }
}

impl From<&str> for Selector {
    fn from(expr: &str) -> Self {
        Self::Expr(expr.to_string())
    }
}

impl From<String> for Selector {
    fn from(expr: String) -> Self {
        Self::Expr(expr)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("Selector::None"),
            Self::Expr(expr) => f.debug_tuple("Selector::Expr").field(expr).finish(),
            Self::Deferred(_) => f.write_str("Selector::Deferred(..)"),
        }
    }
}

/// A parsed selector expression ready to run against a document
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    expr: String,
    css: scraper::Selector,
    attr: Option<String>,
}

impl CompiledSelector {
    /// Parses an expression of the form `css` or `css@attribute`
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidSelector`] when the CSS part is empty
    /// or does not parse.
    pub fn parse(expr: &str) -> Result<Self, ExtractError> {
        let trimmed = expr.trim();
        let (css, attr) = match trimmed.rsplit_once('@') {
            Some((css, attr)) if is_attribute_name(attr) => (css.trim(), Some(attr.to_string())),
            _ => (trimmed, None),
        };

        if css.is_empty() {
            return Err(ExtractError::InvalidSelector {
                selector: expr.to_string(),
                message: "missing element selector".to_string(),
            });
        }

        let css = scraper::Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
            selector: expr.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            expr: trimmed.to_string(),
            css,
            attr,
        })
    }

    /// Returns the source expression
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Runs the selector and returns every non-blank match, trimmed
    ///
    /// With an attribute, elements lacking it are skipped. Without one, each
    /// element yields its text content, or its outer HTML when
    /// `text_content_only` is false.
    pub fn select(&self, html: &Html, text_content_only: bool) -> Vec<String> {
        html.select(&self.css)
            .filter_map(|element| {
                let value = match &self.attr {
                    Some(attr) => element.value().attr(attr)?.to_string(),
                    None if text_content_only => element.text().collect::<String>(),
                    None => element.html(),
                };
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            })
            .collect()
    }
}

fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}
