//! WebCrawl: a crawl and document extraction engine
//!
//! This crate fetches web pages, follows redirects under a configurable policy,
//! classifies discovered links as internal or external to a site, and turns raw
//! HTML into a structured [`Document`] made of extractor-defined fields and the
//! page's visible text split into sentences.

pub mod config;
pub mod crawler;
pub mod document;
pub mod extract;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
///
/// Ordinary network failures never surface here; they are folded into empty
/// documents by the crawler. What remains are contract errors raised by misuse.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Extraction error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("Document error: {0}")]
    Document(#[from] document::DocumentError),

    #[error("Invalid path pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern in config: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Invalid URL '{url}': {reason}")]
    Invalid { url: String, reason: String },

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Operation requires an absolute URL, got: {0}")]
    Relative(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, FetchError, Resolver, SiteOptions, Transport};
pub use document::{Document, DocumentSource, SearchOptions};
pub use extract::{Extractor, ExtractorRegistry, Selector, Source, SourceKind};
pub use robots::{RobotsGate, RobotsRules};
pub use url::Url;
