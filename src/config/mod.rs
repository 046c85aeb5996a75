//! Configuration module for WebCrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use webcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("webcrawl.toml")).unwrap();
//! println!("Redirect limit: {}", config.crawler.redirect_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, SiteConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
