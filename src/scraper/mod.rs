//! Source adapters and chapter extraction. Source detection, the shared client, and one
//! pure markup parser per supported site.

mod client;
mod error;

pub mod asurascans;
pub mod drakescans;

#[cfg(test)]
pub(crate) mod fixture;

pub use client::{
    with_retry, Fetcher, PoliteClient, PoliteClientBuilder, RawResponse, RetryPolicy,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, DEFAULT_USER_AGENT,
};
pub use error::{ExtractError, FetchError, SourceError};

use crate::model::ChapterRecord;
use reqwest::Url;
use scraper::{Html, Selector};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Supported content site. Each variant owns one URL rule and one markup rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Reader-script layout: images live in a `<noscript>` fallback inside `#readerarea`.
    DrakeScans,
    /// Direct gallery layout: images are plain `<img>` elements tagged "chapter page".
    AsuraScans,
}

/// Title and image locations pulled from one chapter page, in DOM order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChapter {
    pub title: String,
    pub image_urls: Vec<String>,
}

impl Source {
    pub fn name(&self) -> &'static str {
        match self {
            Source::DrakeScans => "drakescans",
            Source::AsuraScans => "asurascans",
        }
    }

    /// Chapter page URL for `chapter` under the series `base`.
    pub fn chapter_url(&self, base: &str, chapter: u32) -> String {
        match self {
            Source::DrakeScans => drakescans::chapter_url(base, chapter),
            Source::AsuraScans => asurascans::chapter_url(base, chapter),
        }
    }

    /// Parse a fetched chapter page. Relative image sources are resolved against `page_url`.
    pub fn parse_chapter_page(
        &self,
        html: &str,
        page_url: &str,
    ) -> Result<ParsedChapter, ExtractError> {
        match self {
            Source::DrakeScans => drakescans::parse_chapter_page(html, page_url),
            Source::AsuraScans => asurascans::parse_chapter_page(html, page_url),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drakescans" | "drake" | "1" => Ok(Source::DrakeScans),
            "asurascans" | "asura" | "2" => Ok(Source::AsuraScans),
            other => Err(SourceError::UnknownName(other.to_string())),
        }
    }
}

/// Resolve which source to use from the base URL and an optional override.
pub fn resolve_source(url_input: &str, override_source: Option<Source>) -> Result<Source, SourceError> {
    if let Some(source) = override_source {
        return Ok(source);
    }
    let url = Url::parse(url_input).map_err(|e| SourceError::InvalidUrl {
        input: url_input.to_string(),
        reason: e.to_string(),
    })?;
    let host = url.host_str().ok_or_else(|| SourceError::InvalidUrl {
        input: url_input.to_string(),
        reason: "URL has no host".to_string(),
    })?;
    if host.contains("drakecomic") || host.contains("drakescans") {
        Ok(Source::DrakeScans)
    } else if host.contains("asuracomic") || host.contains("asurascans") {
        Ok(Source::AsuraScans)
    } else {
        Err(SourceError::UnrecognizedHost {
            host: host.to_string(),
        })
    }
}

/// Fetch and parse one chapter.
///
/// A chapter page without images still yields a record (with an empty image
/// list); that case is logged at warn level and the markup is dumped at debug
/// level, since it usually means the site layout changed.
pub fn extract_chapter<F: Fetcher + ?Sized>(
    fetcher: &mut F,
    source: Source,
    base: &str,
    chapter: u32,
) -> Result<ChapterRecord, ExtractError> {
    let url = source.chapter_url(base, chapter);
    info!("Chapter {}: fetching {}", chapter, url);
    let response = fetcher.fetch(&url)?;
    let html = response.text().map_err(|e| ExtractError::Markup {
        url: url.clone(),
        reason: format!("response body is not UTF-8: {}", e),
    })?;
    if html.trim().is_empty() {
        return Err(ExtractError::Markup {
            url,
            reason: "empty document".to_string(),
        });
    }

    let parsed = source.parse_chapter_page(html, &response.url)?;
    debug!("Chapter {}: title {:?}", chapter, parsed.title);
    if parsed.image_urls.is_empty() {
        warn!(
            "Chapter {}: no page images found at {} (page layout may have changed)",
            chapter, url
        );
        debug!("Chapter {} markup:\n{}", chapter, html);
    } else {
        info!(
            "Chapter {}: found {} page images",
            chapter,
            parsed.image_urls.len()
        );
    }
    Ok(ChapterRecord::from_urls(
        chapter,
        parsed.title,
        parsed.image_urls,
    ))
}

/// Parse a CSS selector or return a markup error (avoids panics from Selector::parse).
pub(crate) fn parse_selector(sel: &str, page_url: &str) -> Result<Selector, ExtractError> {
    Selector::parse(sel).map_err(|e| ExtractError::Markup {
        url: page_url.to_string(),
        reason: format!("invalid selector {:?}: {}", sel, e),
    })
}

/// Text of the `<title>` element, trimmed. Empty when the page has none.
pub(crate) fn page_title(doc: &Html, page_url: &str) -> Result<String, ExtractError> {
    let title_sel = parse_selector("title", page_url)?;
    Ok(doc
        .select(&title_sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .unwrap_or_default())
}

/// Trim an image source and make it absolute against the page URL.
pub(crate) fn resolve_image_url(page_url: &str, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    let resolved = match Url::parse(page_url) {
        Ok(base) => base.join(src),
        Err(_) => Url::parse(src),
    };
    match resolved {
        Ok(u) => Some(u.to_string()),
        Err(e) => {
            debug!("Dropping image source {:?} on {}: {}", src, page_url, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::FixtureFetcher;
    use super::*;
    use crate::model::PageImage;

    #[test]
    fn source_from_str_accepts_names_and_menu_numbers() -> Result<(), SourceError> {
        assert_eq!("drakescans".parse::<Source>()?, Source::DrakeScans);
        assert_eq!("Drake".parse::<Source>()?, Source::DrakeScans);
        assert_eq!("1".parse::<Source>()?, Source::DrakeScans);
        assert_eq!("asurascans".parse::<Source>()?, Source::AsuraScans);
        assert_eq!(" 2 ".parse::<Source>()?, Source::AsuraScans);
        assert!("mangadex".parse::<Source>().is_err());
        Ok(())
    }

    #[test]
    fn source_detection_from_host() -> Result<(), SourceError> {
        assert_eq!(
            resolve_source("https://drakecomic.org/sss-grade-saint-knight", None)?,
            Source::DrakeScans
        );
        assert_eq!(
            resolve_source(
                "https://asuracomic.net/series/omniscient-readers-viewpoint-5bb0db14",
                None
            )?,
            Source::AsuraScans
        );
        Ok(())
    }

    #[test]
    fn source_detection_unrecognized_host_errors() -> Result<(), String> {
        let result = resolve_source("https://example.com/series-x", None);
        match &result {
            Err(SourceError::UnrecognizedHost { host }) if host == "example.com" => Ok(()),
            _ => Err(format!("expected UnrecognizedHost, got {:?}", result)),
        }
    }

    #[test]
    fn source_override_ignores_url_host() -> Result<(), SourceError> {
        let source = resolve_source("https://example.com/series-x", Some(Source::DrakeScans))?;
        assert_eq!(source, Source::DrakeScans);
        Ok(())
    }

    #[test]
    fn source_detection_invalid_url_errors() {
        assert!(matches!(
            resolve_source("not-a-url", None),
            Err(SourceError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn resolve_image_url_handles_relative_and_blank() {
        assert_eq!(
            resolve_image_url("https://example.com/series-x-chapter-1/", " /img/01.webp "),
            Some("https://example.com/img/01.webp".to_string())
        );
        assert_eq!(
            resolve_image_url("https://example.com/a/", "https://cdn.example.com/01.jpg"),
            Some("https://cdn.example.com/01.jpg".to_string())
        );
        assert_eq!(resolve_image_url("https://example.com/a/", "   "), None);
    }

    #[test]
    fn extract_reader_script_chapter_scenario() -> Result<(), ExtractError> {
        let html = r#"<html><head><title> Series X Chapter 1 - Drake Scans </title></head><body>
<div id="readerarea"><noscript><p><img src="https://example.com/u1.jpg"/><img src="https://example.com/u2.jpg"/><img src="https://example.com/u3.jpg"/></p></noscript></div>
</body></html>"#;
        let mut fetcher = FixtureFetcher::new()
            .with_page("https://example.com/series-x-chapter-1/", html);
        let record = extract_chapter(
            &mut fetcher,
            Source::DrakeScans,
            "https://example.com/series-x",
            1,
        )?;
        assert_eq!(record.chapter_number, 1);
        assert_eq!(record.title, "Series X Chapter 1 - Drake Scans");
        assert_eq!(
            record.images,
            vec![
                PageImage {
                    url: "https://example.com/u1.jpg".into(),
                    page: 1
                },
                PageImage {
                    url: "https://example.com/u2.jpg".into(),
                    page: 2
                },
                PageImage {
                    url: "https://example.com/u3.jpg".into(),
                    page: 3
                },
            ]
        );
        assert_eq!(
            fetcher.requested(),
            vec!["https://example.com/series-x-chapter-1/".to_string()]
        );
        Ok(())
    }

    #[test]
    fn extract_page_without_images_is_an_empty_record() -> Result<(), ExtractError> {
        let html = "<html><head><title>Chapter 4</title></head><body><div id=\"readerarea\"></div></body></html>";
        let mut fetcher =
            FixtureFetcher::new().with_page("https://example.com/series/chapter/4", html);
        let record = extract_chapter(
            &mut fetcher,
            Source::AsuraScans,
            "https://example.com/series/",
            4,
        )?;
        assert_eq!(record.chapter_number, 4);
        assert_eq!(record.title, "Chapter 4");
        assert!(record.images.is_empty());
        Ok(())
    }

    #[test]
    fn extract_fetch_failure_is_an_error() {
        let mut fetcher = FixtureFetcher::new().with_failure("https://example.com/s-chapter-2/");
        let result = extract_chapter(&mut fetcher, Source::DrakeScans, "https://example.com/s", 2);
        assert!(matches!(result, Err(ExtractError::Fetch(_))));
    }

    #[test]
    fn extract_empty_or_binary_body_is_a_markup_error() {
        let mut fetcher = FixtureFetcher::new()
            .with_page("https://example.com/s-chapter-1/", "   \n")
            .with_page("https://example.com/s-chapter-2/", vec![0xff, 0xfe, 0x00, 0x9f]);
        let empty = extract_chapter(&mut fetcher, Source::DrakeScans, "https://example.com/s", 1);
        assert!(matches!(empty, Err(ExtractError::Markup { .. })));
        let binary = extract_chapter(&mut fetcher, Source::DrakeScans, "https://example.com/s", 2);
        assert!(matches!(binary, Err(ExtractError::Markup { .. })));
    }
}
