//! Default extractors every document carries

use super::text::extract_text;
use super::{Extractor, Selector, Source, SourceKind, TransformError};
use crate::url::Url;
use serde_json::Value;
use std::collections::HashSet;

/// Returns the default extractors in run order
///
/// | field | expression | cardinality |
/// |-------|------------|-------------|
/// | `base` | `base@href` | one |
/// | `title` | `title` | one |
/// | `description` | `meta[name='description']@content` | one |
/// | `author` | `meta[name='author']@content` | one |
/// | `keywords` | `meta[name='keywords']@content`, split on commas | list |
/// | `links` | `a@href`, crawlable links only | list |
/// | `text` | visible text sentences | list |
pub fn default_extractors() -> Vec<Extractor> {
    vec![
        Extractor::new("base", "base@href"),
        Extractor::new("title", "title"),
        Extractor::new("description", "meta[name='description']@content"),
        Extractor::new("author", "meta[name='author']@content"),
        Extractor::new("keywords", "meta[name='keywords']@content").transform(keywords),
        Extractor::new("links", "a@href")
            .singleton(false)
            .transform(links),
        Extractor::new("text", Selector::None).transform(text),
    ]
}

fn keywords(
    value: &Value,
    _source: &Source<'_>,
    kind: SourceKind,
) -> Result<Option<Value>, TransformError> {
    match (kind, value) {
        (SourceKind::Html, Value::String(content)) => {
            let mut seen = HashSet::new();
            let keywords = content
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty() && seen.insert(k.to_string()))
                .map(|k| Value::String(k.to_string()))
                .collect();
            Ok(Some(Value::Array(keywords)))
        }
        (_, Value::Null) => Ok(Some(Value::Array(Vec::new()))),
        _ => Ok(None),
    }
}

fn links(
    value: &Value,
    _source: &Source<'_>,
    kind: SourceKind,
) -> Result<Option<Value>, TransformError> {
    if kind != SourceKind::Html {
        return Ok(None);
    }

    let Some(hrefs) = value.as_array() else {
        return Ok(None);
    };

    let mut seen = HashSet::new();
    let links = hrefs
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|href| is_crawlable_link(href))
        .filter(|href| seen.insert(href.to_string()))
        .map(|href| Value::String(href.to_string()))
        .collect();

    Ok(Some(Value::Array(links)))
}

/// Keeps links a crawler can follow
///
/// Drops blank and fragment-only hrefs plus anything that is not an
/// http(s) or relative address (`mailto:`, `javascript:`, `data:` ...).
/// Protocol-relative hrefs are kept; the document resolves them.
pub(crate) fn is_crawlable_link(href: &str) -> bool {
    if href.is_empty() || href.starts_with('#') {
        return false;
    }
    href.starts_with("//") || Url::parse(href).is_ok()
}

fn text(value: &Value, source: &Source<'_>, _kind: SourceKind) -> Result<Option<Value>, TransformError> {
    match source {
        Source::Html(html) => {
            let sentences = extract_text(html).into_iter().map(Value::String).collect();
            Ok(Some(Value::Array(sentences)))
        }
        Source::Stored(_) if value.is_null() => Ok(Some(Value::Array(Vec::new()))),
        Source::Stored(_) => Ok(None),
    }
}
