//! mangapdf: CLI scraper for Drake Scans and Asura Scans comics, outputting one PDF per chapter.

pub mod cli;
pub mod config;
pub mod model;
pub mod orchestrator;
pub mod pacing;
pub mod pdf;
pub mod scraper;
pub mod snapshot;

// Re-exports for CLI and consumers.
pub use model::{ChapterCollection, ChapterRecord, PageImage};
pub use orchestrator::{scrape_chapters, ChapterRange, ChapterState, ScrapeOptions, ScrapeRun};
pub use pdf::{assemble_all, assemble_chapter, AssembleError, AssembleReport};
pub use scraper::{
    extract_chapter, resolve_source, ExtractError, FetchError, Fetcher, PoliteClient,
    PoliteClientBuilder, Source, SourceError,
};
pub use snapshot::SnapshotError;
