//! Blocking HTTP client with a static browser-like header set and bounded, fixed-delay retries.

use crate::pacing::{Sleep, ThreadSleep};
use crate::scraper::error::FetchError;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE,
    UPGRADE_INSECURE_REQUESTS,
};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// Total attempts per request (initial plus retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Fixed delay between attempts. Not exponential.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// A fully buffered successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }
}

/// The single I/O primitive the extractors and the assembler depend on.
pub trait Fetcher {
    fn fetch(&mut self, url: &str) -> Result<RawResponse, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &mut F {
    fn fetch(&mut self, url: &str) -> Result<RawResponse, FetchError> {
        (**self).fetch(url)
    }
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Run `attempt` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// `attempt` receives the 1-based attempt number. The last error is returned
/// unchanged. Sleeps only between attempts, never after the final one.
pub fn with_retry<T, E, F>(policy: &RetryPolicy, sleeper: &dyn Sleep, mut attempt: F) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut n = 1;
    loop {
        match attempt(n) {
            Ok(value) => return Ok(value),
            Err(e) if n < max_attempts => {
                warn!(
                    "attempt {}/{} failed: {}; retrying in {} ms",
                    n,
                    max_attempts,
                    e,
                    policy.delay.as_millis()
                );
                sleeper.sleep(policy.delay);
                n += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Blocking HTTP client that sends the static header set and retries transient failures.
pub struct PoliteClient {
    inner: reqwest::blocking::Client,
    retry: RetryPolicy,
    sleeper: Box<dyn Sleep>,
}

impl fmt::Debug for PoliteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoliteClient")
            .field("inner", &self.inner)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl PoliteClient {
    /// Build a client with the default header set, timeout and retry policy.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> PoliteClientBuilder {
        PoliteClientBuilder::default()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// One GET without retry. Non-2xx statuses are errors.
    fn send_once(&self, url: &str) -> Result<RawResponse, FetchError> {
        let response = self
            .inner
            .get(url)
            .send()
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().map_err(|e| FetchError::BodyRead {
            url: url.to_string(),
            source: e,
        })?;
        debug!(
            "GET {} -> {} ({} bytes, {})",
            url,
            status.as_u16(),
            body.len(),
            content_type.as_deref().unwrap_or("no content-type")
        );
        Ok(RawResponse {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}

impl Fetcher for PoliteClient {
    fn fetch(&mut self, url: &str) -> Result<RawResponse, FetchError> {
        with_retry(&self.retry, self.sleeper.as_ref(), |_| self.send_once(url))
    }
}

/// The fixed header set sent with every request (User-Agent is set separately).
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
    );
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

/// Builder for PoliteClient with optional User-Agent, timeout, retry settings and sleeper.
pub struct PoliteClientBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
    retry: RetryPolicy,
    sleeper: Box<dyn Sleep>,
}

impl Default for PoliteClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            sleeper: Box::new(ThreadSleep),
        }
    }
}

impl PoliteClientBuilder {
    /// Set a custom User-Agent. If not set, a desktop Chrome string is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set total attempts per request (default 3, minimum 1).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.retry.max_attempts = n.max(1);
        self
    }

    /// Set the fixed delay between attempts (default 2000 ms).
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry.delay = delay;
        self
    }

    /// Replace the thread sleeper used between attempts.
    pub fn sleeper(mut self, sleeper: Box<dyn Sleep>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn build(self) -> Result<PoliteClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .default_headers(default_headers())
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(PoliteClient {
            inner,
            retry: self.retry,
            sleeper: self.sleeper,
        })
    }
}
