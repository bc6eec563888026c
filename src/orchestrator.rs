//! Sequential, paced scraping over a chapter range.
//!
//! Each chapter moves Pending -> Fetching -> Recorded | Skipped. A failed chapter
//! is logged and skipped; the run always covers the whole range. After every
//! chapter the orchestrator waits the pacing interval before the next request.

use crate::model::ChapterCollection;
use crate::pacing::Sleep;
use crate::scraper::{extract_chapter, Fetcher, Source};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default pause after each chapter.
pub const DEFAULT_CHAPTER_DELAY: Duration = Duration::from_millis(2000);

/// Inclusive, 1-based chapter range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRange {
    start: u32,
    end: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("chapter numbers start at 1 (got {0})")]
    Zero(u32),

    #[error("start chapter ({start}) must be <= end chapter ({end})")]
    Reversed { start: u32, end: u32 },
}

impl ChapterRange {
    pub fn new(start: u32, end: u32) -> Result<Self, RangeError> {
        if start == 0 {
            return Err(RangeError::Zero(start));
        }
        if start > end {
            return Err(RangeError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of chapters in the range (always at least 1).
    pub fn count(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

impl fmt::Display for ChapterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Where one chapter is in the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterState {
    Pending(u32),
    Fetching(u32),
    Recorded { chapter: u32, images: usize },
    Skipped { chapter: u32, reason: String },
}

impl ChapterState {
    pub fn chapter(&self) -> u32 {
        match self {
            ChapterState::Pending(n) | ChapterState::Fetching(n) => *n,
            ChapterState::Recorded { chapter, .. } | ChapterState::Skipped { chapter, .. } => {
                *chapter
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChapterState::Recorded { .. } | ChapterState::Skipped { .. }
        )
    }
}

/// Options for a scrape run: range, pacing, and an optional progress callback `(done, total)`.
pub struct ScrapeOptions<'a> {
    pub range: ChapterRange,
    pub chapter_delay: Duration,
    pub progress: Option<&'a dyn Fn(u32, u32)>,
}

impl ScrapeOptions<'_> {
    pub fn new(range: ChapterRange) -> Self {
        Self {
            range,
            chapter_delay: DEFAULT_CHAPTER_DELAY,
            progress: None,
        }
    }
}

/// Result of a run: the collected chapters plus one terminal state per chapter number.
#[derive(Debug, Clone, Default)]
pub struct ScrapeRun {
    pub chapters: ChapterCollection,
    pub outcomes: Vec<ChapterState>,
}

impl ScrapeRun {
    pub fn recorded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ChapterState::Recorded { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ChapterState::Skipped { .. }))
            .count()
    }
}

/// Scrape every chapter in `options.range`, one at a time.
pub fn scrape_chapters<F: Fetcher + ?Sized>(
    fetcher: &mut F,
    source: Source,
    base: &str,
    options: &ScrapeOptions<'_>,
    sleeper: &dyn Sleep,
) -> ScrapeRun {
    let total = options.range.count();
    let mut run = ScrapeRun {
        chapters: ChapterCollection::new(),
        outcomes: Vec::new(),
    };

    for (done, chapter) in options.range.iter().enumerate() {
        info!("Scraping chapter {}...", chapter);
        let state = advance(
            ChapterState::Pending(chapter),
            fetcher,
            source,
            base,
            &mut run.chapters,
        );
        debug_assert!(state.is_terminal());
        run.outcomes.push(state);

        if let Some(progress) = options.progress {
            progress(done as u32 + 1, total);
        }
        sleeper.sleep(options.chapter_delay);
    }

    info!(
        "Scraped {} of {} chapter(s) in range {} ({} skipped)",
        run.recorded(),
        total,
        options.range,
        run.skipped()
    );
    run
}

/// Drive one chapter from Pending to a terminal state.
fn advance<F: Fetcher + ?Sized>(
    mut state: ChapterState,
    fetcher: &mut F,
    source: Source,
    base: &str,
    chapters: &mut ChapterCollection,
) -> ChapterState {
    loop {
        state = match state {
            ChapterState::Pending(n) => ChapterState::Fetching(n),
            ChapterState::Fetching(n) => match extract_chapter(fetcher, source, base, n) {
                Ok(record) => {
                    let images = record.images.len();
                    chapters.push(record);
                    info!("Successfully scraped chapter {} ({} images)", n, images);
                    ChapterState::Recorded { chapter: n, images }
                }
                Err(e) => {
                    warn!("Failed to scrape chapter {}: {}. Skipped.", n, e);
                    ChapterState::Skipped {
                        chapter: n,
                        reason: e.to_string(),
                    }
                }
            },
            terminal => {
                debug!("Chapter {} done: {:?}", terminal.chapter(), terminal);
                return terminal;
            }
        };
    }
}
