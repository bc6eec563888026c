//! Canonical data model for scraped chapters.
//!
//! The extractors produce [ChapterRecord]s, the orchestrator owns them in a
//! [ChapterCollection], and the snapshot writer and PDF assembler borrow it.

use serde::{Deserialize, Serialize};

/// One page image of a chapter, in on-page reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// Absolute URL of the image.
    pub url: String,
    /// 1-based position within the chapter.
    pub page: u32,
}

/// One scraped chapter.
///
/// An empty `images` list is a valid record: the chapter page was fetched and
/// parsed but no page images were found on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterRecord {
    pub chapter_number: u32,
    pub title: String,
    pub images: Vec<PageImage>,
}

impl ChapterRecord {
    /// Build a record from image URLs in DOM order, numbering pages 1..=k.
    pub fn from_urls<I>(chapter_number: u32, title: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let images = urls
            .into_iter()
            .zip(1u32..)
            .map(|(url, page)| PageImage { url, page })
            .collect();
        Self {
            chapter_number,
            title: title.into(),
            images,
        }
    }
}

/// Chapters in scrape order. Failed chapters are absent, not placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterCollection {
    chapters: Vec<ChapterRecord>,
}

impl ChapterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chapter: ChapterRecord) {
        self.chapters.push(chapter);
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChapterRecord> {
        self.chapters.iter()
    }

    pub fn get(&self, chapter_number: u32) -> Option<&ChapterRecord> {
        self.chapters
            .iter()
            .find(|c| c.chapter_number == chapter_number)
    }

    pub fn as_slice(&self) -> &[ChapterRecord] {
        &self.chapters
    }
}

impl From<Vec<ChapterRecord>> for ChapterCollection {
    fn from(chapters: Vec<ChapterRecord>) -> Self {
        Self { chapters }
    }
}

impl<'a> IntoIterator for &'a ChapterCollection {
    type Item = &'a ChapterRecord;
    type IntoIter = std::slice::Iter<'a, ChapterRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.chapters.iter()
    }
}
