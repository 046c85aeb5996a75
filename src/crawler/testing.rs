//! In-memory transport for unit tests

use super::transport::{Response, Transport, TransportError, TransportErrorKind};
use crate::url::Url;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Serves canned responses by exact URL and records every request
#[derive(Debug, Default)]
pub(crate) struct StubTransport {
    responses: HashMap<String, Response>,
    requests: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        let response = Response::new(url, 200)
            .with_header("content-type", "text/html")
            .with_body(html);
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn redirect(mut self, from: &str, location: &str) -> Self {
        let response = Response::new(from, 302).with_header("location", location);
        self.responses.insert(from.to_string(), response);
        self
    }

    pub fn respond(mut self, url: &str, response: Response) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &Url, _timeout: Duration) -> Result<Response, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.responses.get(url.as_str()).cloned().ok_or_else(|| {
            TransportError::new(TransportErrorKind::Connect, format!("no route to {}", url))
        })
    }
}
