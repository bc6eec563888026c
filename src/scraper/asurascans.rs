//! Asura Scans adapter (direct gallery layout). Page images are ordinary `<img>`
//! elements in the main markup, told apart from covers and ads by their alt text.

use crate::scraper::{
    page_title, parse_selector, resolve_image_url, ExtractError, ParsedChapter,
};
use scraper::Html;

const PAGE_ALT_PREFIX: &str = "chapter page";

/// `{base}/chapter/{n}`
pub(crate) fn chapter_url(base: &str, chapter: u32) -> String {
    format!("{}/chapter/{}", base.trim_end_matches('/'), chapter)
}

/// Title plus every `div.py-8 img` whose alt starts with "chapter page", in DOM order.
pub(crate) fn parse_chapter_page(html: &str, page_url: &str) -> Result<ParsedChapter, ExtractError> {
    let doc = Html::parse_document(html);
    let title = page_title(&doc, page_url)?;

    let img_sel = parse_selector("div.py-8 img", page_url)?;
    let image_urls = doc
        .select(&img_sel)
        .filter(|img| {
            img.value()
                .attr("alt")
                .is_some_and(|alt| alt.starts_with(PAGE_ALT_PREFIX))
        })
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| resolve_image_url(page_url, src))
        .collect();

    Ok(ParsedChapter { title, image_urls })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str =
        "https://asuracomic.net/series/omniscient-readers-viewpoint-5bb0db14/chapter/5";

    #[test]
    fn chapter_url_uses_chapter_path_segment() {
        assert_eq!(
            chapter_url("https://asuracomic.net/series/orv-5bb0db14", 5),
            "https://asuracomic.net/series/orv-5bb0db14/chapter/5"
        );
        assert_eq!(
            chapter_url("https://asuracomic.net/series/orv-5bb0db14/", 5),
            "https://asuracomic.net/series/orv-5bb0db14/chapter/5"
        );
    }

    #[test]
    fn only_chapter_page_images_are_kept_in_order() -> Result<(), ExtractError> {
        let html = r#"<!DOCTYPE html><html><head><title>
  Omniscient Reader's Viewpoint Chapter 5 - Asura Scans
</title></head><body>
<div class="py-8 -mx-5 md:mx-0 flex flex-col items-center justify-center">
  <img src="https://gg.asuracomic.net/ads/banner.gif" alt="advertisement">
  <div class="w-full mx-auto center"><img class="object-cover mx-auto" src="https://gg.asuracomic.net/storage/media/5/01.webp" alt="chapter page 1"></div>
  <div class="w-full mx-auto center"><img class="object-cover mx-auto" src="https://gg.asuracomic.net/storage/media/5/02.webp" alt="chapter page 2"></div>
  <img src="https://gg.asuracomic.net/storage/media/5/03.webp">
  <div class="w-full mx-auto center"><img class="object-cover mx-auto" src="https://gg.asuracomic.net/storage/media/5/04.webp" alt="chapter page 3"></div>
</div>
<img src="https://gg.asuracomic.net/storage/media/5/99.webp" alt="chapter page 99">
</body></html>"#;
        let parsed = parse_chapter_page(html, PAGE_URL)?;
        assert_eq!(
            parsed.title,
            "Omniscient Reader's Viewpoint Chapter 5 - Asura Scans"
        );
        assert_eq!(
            parsed.image_urls,
            vec![
                "https://gg.asuracomic.net/storage/media/5/01.webp",
                "https://gg.asuracomic.net/storage/media/5/02.webp",
                "https://gg.asuracomic.net/storage/media/5/04.webp",
            ]
        );
        Ok(())
    }

    #[test]
    fn alt_prefix_is_case_sensitive() -> Result<(), ExtractError> {
        let html = r#"<html><body><div class="py-8">
<img src="https://c.example/1.webp" alt="Chapter Page 1">
<img src="https://c.example/2.webp" alt="chapter page 2">
</div></body></html>"#;
        let parsed = parse_chapter_page(html, PAGE_URL)?;
        assert_eq!(parsed.title, "");
        assert_eq!(parsed.image_urls, vec!["https://c.example/2.webp"]);
        Ok(())
    }

    #[test]
    fn tagged_image_without_src_is_skipped() -> Result<(), ExtractError> {
        let html = r#"<html><body><div class="py-8">
<img alt="chapter page 1">
<img src="/storage/2.webp" alt="chapter page 2">
</div></body></html>"#;
        let parsed = parse_chapter_page(html, PAGE_URL)?;
        assert_eq!(
            parsed.image_urls,
            vec!["https://asuracomic.net/storage/2.webp"]
        );
        Ok(())
    }
}
