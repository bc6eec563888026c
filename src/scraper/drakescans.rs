//! Drake Scans adapter (reader-script layout).
//!
//! The reader area is filled in by client-side script; the real page list is only
//! present in the `<noscript>` fallback block, which the HTML parser keeps as raw
//! text. That text is parsed again as a fragment to reach the `<img>` elements.

use crate::scraper::{
    page_title, parse_selector, resolve_image_url, ExtractError, ParsedChapter,
};
use scraper::Html;

/// `{base}-chapter-{n}/`
pub(crate) fn chapter_url(base: &str, chapter: u32) -> String {
    format!("{}-chapter-{}/", base.trim_end_matches('/'), chapter)
}

/// Title plus `img[src]` from the first `#readerarea noscript` block, in DOM order.
pub(crate) fn parse_chapter_page(html: &str, page_url: &str) -> Result<ParsedChapter, ExtractError> {
    let doc = Html::parse_document(html);
    let title = page_title(&doc, page_url)?;

    let noscript_sel = parse_selector("#readerarea noscript", page_url)?;
    let img_sel = parse_selector("img", page_url)?;

    let image_urls = match doc.select(&noscript_sel).next() {
        Some(block) => {
            let inner: String = block.text().collect();
            let fragment = Html::parse_fragment(&inner);
            fragment
                .select(&img_sel)
                .filter_map(|img| img.value().attr("src"))
                .filter_map(|src| resolve_image_url(page_url, src))
                .collect()
        }
        None => Vec::new(),
    };

    Ok(ParsedChapter { title, image_urls })
}
