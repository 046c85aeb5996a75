//! Crawler module for page fetching and site traversal
//!
//! This module contains the core crawling logic, including:
//! - The HTTP transport seam and its `reqwest` implementation
//! - Redirect following under a hop limit and domain policy
//! - Single page, page list and whole-site crawls

mod engine;
mod resolver;
mod state;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{CrawlEngine, SiteOptions, DEFAULT_FOLLOW};
pub use resolver::{
    FetchError, RedirectObserver, ResolveOptions, Resolver, DEFAULT_REDIRECT_LIMIT, DEFAULT_TIMEOUT,
};
pub use transport::{
    build_http_client, user_agent, ReqwestTransport, Response, Transport, TransportError,
    TransportErrorKind,
};
