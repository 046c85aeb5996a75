//! The shared extractor registry
//!
//! One registry is typically built at startup and shared (behind an `Arc`)
//! by every crawl. Reads take a shared lock; `define` and `remove` take the
//! write lock, so concurrent crawls see a consistent set of extractors.

use super::defaults::default_extractors;
use super::{ExtractError, Extractor, Source};
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};

/// Field names reserved for the document record itself
const RESERVED_NAMES: &[&str] = &["url", "html", "score"];

/// Ordered table of extractors keyed by field name
#[derive(Debug)]
pub struct ExtractorRegistry {
    extractors: RwLock<Vec<Arc<Extractor>>>,
}

impl ExtractorRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            extractors: RwLock::new(Vec::new()),
        }
    }

    /// Creates a registry holding the default extractors
    ///
    /// Defaults: `base`, `title`, `description`, `author`, `keywords`,
    /// `links` and `text`.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for extractor in default_extractors() {
            let name = extractor.name().to_string();
            if let Err(e) = registry.define(extractor) {
                tracing::error!("Failed to register default extractor '{}': {}", name, e);
            }
        }
        registry
    }

    /// Registers an extractor, replacing any previous one with the same name
    ///
    /// A replaced extractor keeps its position in the run order. Static
    /// selector expressions are compiled here, so a syntax error fails the
    /// definition; deferred expressions fail on first use instead.
    ///
    /// # Errors
    ///
    /// * [`ExtractError::InvalidName`] - name does not match `[a-z][a-z0-9_]*`
    ///   or is reserved (`url`, `html`, `score`)
    /// * [`ExtractError::InvalidSelector`] - static expression does not parse
    pub fn define(&self, mut extractor: Extractor) -> Result<String, ExtractError> {
        validate_name(extractor.name())?;
        extractor.compile()?;

        let name = extractor.name().to_string();
        let extractor = Arc::new(extractor);

        let mut extractors = self.extractors.write().unwrap_or_else(PoisonError::into_inner);
        match extractors.iter_mut().find(|e| e.name() == name) {
            Some(existing) => {
                tracing::debug!("Replacing extractor '{}'", name);
                *existing = extractor;
            }
            None => {
                tracing::debug!("Defining extractor '{}'", name);
                extractors.push(extractor);
            }
        }

        Ok(name)
    }

    /// Removes an extractor by name
    ///
    /// Returns false if no extractor had that name. Documents built after
    /// removal no longer carry the field.
    pub fn remove(&self, name: &str) -> bool {
        let mut extractors = self.extractors.write().unwrap_or_else(PoisonError::into_inner);
        let before = extractors.len();
        extractors.retain(|e| e.name() != name);
        let removed = extractors.len() != before;
        if removed {
            tracing::debug!("Removed extractor '{}'", name);
        }
        removed
    }

    /// Looks up an extractor by name
    pub fn get(&self, name: &str) -> Option<Arc<Extractor>> {
        self.snapshot().into_iter().find(|e| e.name() == name)
    }

    /// Returns true if an extractor with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the registered field names in run order
    pub fn names(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.extractors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current extractors without holding the lock
    ///
    /// Extractors run against the snapshot, so a transform may itself call
    /// back into the registry.
    pub fn snapshot(&self) -> Vec<Arc<Extractor>> {
        self.extractors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs every extractor against a source and collects the fields
    ///
    /// Running twice on the same input yields identical maps.
    pub fn run_all(&self, source: &Source<'_>) -> Result<Map<String, Value>, ExtractError> {
        let mut fields = Map::new();
        for extractor in self.snapshot() {
            let value = extractor.extract(source)?;
            fields.insert(extractor.name().to_string(), value);
        }
        Ok(fields)
    }

    /// Builds fields from a stored map, recomputing only what is missing
    ///
    /// Stored non-null values are taken as they are; every other field is
    /// evaluated against the stored source.
    pub fn run_missing(&self, stored: &Map<String, Value>) -> Result<Map<String, Value>, ExtractError> {
        let source = Source::Stored(stored);
        let mut fields = Map::new();
        for extractor in self.snapshot() {
            let value = match stored.get(extractor.name()) {
                Some(value) if !value.is_null() => value.clone(),
                _ => extractor.extract(&source)?,
            };
            fields.insert(extractor.name().to_string(), value);
        }
        Ok(fields)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn validate_name(name: &str) -> Result<(), ExtractError> {
    let invalid = |reason: &str| ExtractError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return Err(invalid("must start with a lowercase letter")),
    }

    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(invalid("must match [a-z][a-z0-9_]*"));
    }

    if RESERVED_NAMES.contains(&name) {
        return Err(invalid("name is reserved for the document record"));
    }

    Ok(())
}
