//! PDF assembly. One document per chapter, one page per page image.
//!
//! Each image is fetched, opened with the writer's native decoders and, if that
//! fails, converted to PNG and opened once more. Pages that still cannot be
//! placed are logged and left out; the document is written regardless.

mod document;
pub mod image;

pub use self::document::PdfDocument;
pub use self::image::{normalize_to_png, EmbeddedImage, ImageDecodeError};

use crate::model::{ChapterCollection, ChapterRecord, PageImage};
use crate::scraper::{FetchError, Fetcher};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Writing a chapter's document failed.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("Cannot write PDF for chapter {chapter}: {path}: {source}")]
    Write {
        chapter: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single page could not be placed. Non-fatal.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not decode image even after PNG conversion: {0}")]
    Decode(#[from] ImageDecodeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedPage {
    /// Source page number.
    pub page: u32,
    pub width: u32,
    pub height: u32,
    /// Image went through PNG conversion before it could be embedded.
    pub normalized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmittedPage {
    pub page: u32,
    pub url: String,
    pub reason: String,
}

/// What went into one chapter document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleReport {
    pub chapter_number: u32,
    pub path: PathBuf,
    pub pages: Vec<PlacedPage>,
    pub omitted: Vec<OmittedPage>,
}

/// `chapter_<n>.pdf`
pub fn chapter_file_name(chapter_number: u32) -> String {
    format!("chapter_{}.pdf", chapter_number)
}

/// Build the document for `chapter` and write it to `destination`.
///
/// Only a failure to write the file is an error; per-image problems end up in
/// [AssembleReport::omitted]. A chapter with no usable images produces a
/// zero-page document.
pub fn assemble_chapter<F: Fetcher + ?Sized>(
    fetcher: &mut F,
    chapter: &ChapterRecord,
    destination: &Path,
) -> Result<AssembleReport, AssembleError> {
    info!("Generating PDF for chapter {}...", chapter.chapter_number);
    let mut doc = PdfDocument::new();
    if !chapter.title.is_empty() {
        doc.set_title(chapter.title.as_str());
    }
    let mut report = AssembleReport {
        chapter_number: chapter.chapter_number,
        path: destination.to_path_buf(),
        pages: Vec::with_capacity(chapter.images.len()),
        omitted: Vec::new(),
    };

    for image in &chapter.images {
        debug!("Processing image {}: {}", image.page, image.url);
        match load_page(fetcher, image) {
            Ok((embedded, normalized)) => {
                doc.add_image_page(&embedded);
                report.pages.push(PlacedPage {
                    page: image.page,
                    width: embedded.width,
                    height: embedded.height,
                    normalized,
                });
            }
            Err(e) => {
                warn!(
                    "Chapter {} page {}: failed to add image to PDF: {}",
                    chapter.chapter_number, image.page, e
                );
                report.omitted.push(OmittedPage {
                    page: image.page,
                    url: image.url.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let bytes = doc.finish();
    write_document(chapter.chapter_number, destination, &bytes)?;
    info!(
        "PDF generated for chapter {}: {} ({} pages, {} omitted)",
        chapter.chapter_number,
        destination.display(),
        report.pages.len(),
        report.omitted.len()
    );
    Ok(report)
}

/// Assemble every chapter into `output_dir/chapter_<n>.pdf`.
///
/// A write failure for one chapter is logged and returned in its slot; the
/// remaining chapters are still assembled.
pub fn assemble_all<F: Fetcher + ?Sized>(
    fetcher: &mut F,
    chapters: &ChapterCollection,
    output_dir: &Path,
) -> Vec<Result<AssembleReport, AssembleError>> {
    chapters
        .iter()
        .map(|chapter| {
            let path = output_dir.join(chapter_file_name(chapter.chapter_number));
            let result = assemble_chapter(fetcher, chapter, &path);
            if let Err(e) = &result {
                warn!("{}", e);
            }
            result
        })
        .collect()
}

/// Fetch one image and open it, converting to PNG when the native decoders refuse it.
fn load_page<F: Fetcher + ?Sized>(
    fetcher: &mut F,
    image: &PageImage,
) -> Result<(EmbeddedImage, bool), PageError> {
    let response = fetcher.fetch(&image.url)?;
    debug!(
        "Page {}: {} bytes, content-type {}",
        image.page,
        response.body.len(),
        response.content_type.as_deref().unwrap_or("unknown")
    );
    match EmbeddedImage::open(&response.body) {
        Ok(embedded) => Ok((embedded, false)),
        Err(direct) => {
            debug!(
                "Page {}: direct embed failed ({}), converting to PNG",
                image.page, direct
            );
            let png = normalize_to_png(&response.body)?;
            Ok((EmbeddedImage::open(&png)?, true))
        }
    }
}

fn write_document(chapter: u32, path: &Path, bytes: &[u8]) -> Result<(), AssembleError> {
    let write_err = |source| AssembleError::Write {
        chapter,
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }
    std::fs::write(path, bytes).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::document::contains;
    use super::image::samples;
    use super::*;
    use crate::scraper::fixture::FixtureFetcher;
    use std::error::Error;

    fn chapter(n: u32, urls: &[&str]) -> ChapterRecord {
        ChapterRecord::from_urls(
            n,
            format!("Series X Chapter {}", n),
            urls.iter().map(|u| u.to_string()),
        )
    }

    fn sizes(report: &AssembleReport) -> Vec<(u32, u32)> {
        report.pages.iter().map(|p| (p.width, p.height)).collect()
    }

    #[test]
    fn three_images_make_a_three_page_document() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut fetcher = FixtureFetcher::new()
            .with_page("https://example.com/u1", samples::jpeg(800, 1200))
            .with_page("https://example.com/u2", samples::png(800, 1150))
            .with_page("https://example.com/u3", samples::jpeg(720, 3000));
        let ch = chapter(
            1,
            &["https://example.com/u1", "https://example.com/u2", "https://example.com/u3"],
        );
        let path = dir.path().join(chapter_file_name(1));
        let report = assemble_chapter(&mut fetcher, &ch, &path)?;

        assert_eq!(sizes(&report), vec![(800, 1200), (800, 1150), (720, 3000)]);
        assert!(report.omitted.is_empty());
        let bytes = std::fs::read(&path)?;
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(contains(&bytes, b"/Count 3"));
        Ok(())
    }

    #[test]
    fn malformed_image_is_left_out_of_five() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut fetcher = FixtureFetcher::new()
            .with_page("https://example.com/p1", samples::jpeg(100, 140))
            .with_page("https://example.com/p2", samples::png(100, 150))
            .with_page("https://example.com/p3", b"\x89PNG\r\n\x1a\ngarbage".to_vec())
            .with_page("https://example.com/p4", samples::jpeg(90, 160))
            .with_page("https://example.com/p5", samples::png(100, 170));
        let ch = chapter(
            2,
            &[
                "https://example.com/p1",
                "https://example.com/p2",
                "https://example.com/p3",
                "https://example.com/p4",
                "https://example.com/p5",
            ],
        );
        let path = dir.path().join(chapter_file_name(2));
        let report = assemble_chapter(&mut fetcher, &ch, &path)?;

        let placed: Vec<u32> = report.pages.iter().map(|p| p.page).collect();
        assert_eq!(placed, vec![1, 2, 4, 5]);
        assert_eq!(
            sizes(&report),
            vec![(100, 140), (100, 150), (90, 160), (100, 170)]
        );
        assert_eq!(report.omitted.len(), 1);
        assert_eq!(report.omitted[0].page, 3);
        assert!(contains(&std::fs::read(&path)?, b"/Count 4"));
        Ok(())
    }

    #[test]
    fn zero_images_still_writes_an_empty_document() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut fetcher = FixtureFetcher::new();
        let path = dir.path().join(chapter_file_name(9));
        let report = assemble_chapter(&mut fetcher, &chapter(9, &[]), &path)?;
        assert!(report.pages.is_empty());
        assert!(report.omitted.is_empty());
        assert!(fetcher.requested().is_empty());
        let bytes = std::fs::read(&path)?;
        assert!(contains(&bytes, b"/Count 0"));
        Ok(())
    }

    #[test]
    fn unsupported_encoding_is_converted_to_png() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut fetcher =
            FixtureFetcher::new().with_page("https://example.com/page.bmp", samples::bmp(33, 44));
        let path = dir.path().join("out.pdf");
        let report = assemble_chapter(&mut fetcher, &chapter(3, &["https://example.com/page.bmp"]), &path)?;
        assert_eq!(
            report.pages,
            vec![PlacedPage {
                page: 1,
                width: 33,
                height: 44,
                normalized: true
            }]
        );
        Ok(())
    }

    #[test]
    fn failed_image_fetch_omits_the_page() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut fetcher = FixtureFetcher::new()
            .with_page("https://example.com/a", samples::png(10, 10))
            .with_failure("https://example.com/b");
        let path = dir.path().join("out.pdf");
        let report = assemble_chapter(
            &mut fetcher,
            &chapter(4, &["https://example.com/a", "https://example.com/b"]),
            &path,
        )?;
        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.omitted[0].url, "https://example.com/b");
        assert!(report.omitted[0].reason.contains("503"));
        Ok(())
    }

    #[test]
    fn write_failure_is_reported_and_other_chapters_continue() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        // chapter_1.pdf is a directory, so writing that document fails.
        std::fs::create_dir(dir.path().join(chapter_file_name(1)))?;
        let mut fetcher = FixtureFetcher::new().with_page("https://example.com/x", samples::png(8, 8));
        let collection = ChapterCollection::from(vec![
            chapter(1, &["https://example.com/x"]),
            chapter(2, &["https://example.com/x"]),
        ]);
        let results = assemble_all(&mut fetcher, &collection, dir.path());
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0],
            Err(AssembleError::Write { chapter: 1, .. })
        ));
        let second = results[1].as_ref().map_err(|e| e.to_string())?;
        assert_eq!(second.pages.len(), 1);
        assert!(dir.path().join("chapter_2.pdf").is_file());
        Ok(())
    }
}
