//! In-memory fetcher for tests: canned bodies per URL, scripted failures, request log.

use super::{FetchError, Fetcher, RawResponse};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub(crate) struct FixtureFetcher {
    pages: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    requested: Vec<String>,
}

impl FixtureFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    /// `url` answers with HTTP 503 (as if every retry failed).
    pub(crate) fn with_failure(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.clone()
    }
}

impl Fetcher for FixtureFetcher {
    fn fetch(&mut self, url: &str) -> Result<RawResponse, FetchError> {
        self.requested.push(url.to_string());
        if self.failing.contains(url) {
            return Err(FetchError::HttpStatus {
                status: 503,
                url: url.to_string(),
            });
        }
        match self.pages.get(url) {
            Some(body) => Ok(RawResponse {
                url: url.to_string(),
                status: 200,
                content_type: None,
                body: body.clone(),
            }),
            None => Err(FetchError::Unavailable {
                url: url.to_string(),
                reason: "no fixture for this URL".to_string(),
            }),
        }
    }
}
