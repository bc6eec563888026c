//! Error types for fetching and chapter extraction.

use thiserror::Error;

/// A single unit of network work failed (after retries, when surfaced by the client).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Transport failure without an underlying reqwest error (used by in-memory fetchers).
    #[error("Request failed for {url}: {reason}")]
    Unavailable { url: String, reason: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::BodyRead { url, .. }
            | FetchError::Unavailable { url, .. } => url,
        }
    }
}

/// Chapter extraction failed; the chapter is skipped.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Could not parse chapter page at {url}: {reason}")]
    Markup { url: String, reason: String },
}

/// Source detection from a base URL failed.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Could not detect source from URL host '{host}'. Use --source drakescans or --source asurascans.")]
    UnrecognizedHost { host: String },

    #[error("Unknown source '{0}'. Use drakescans (1) or asurascans (2).")]
    UnknownName(String),
}
