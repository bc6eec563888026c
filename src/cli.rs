//! CLI parsing and orchestration. Parses args, runs scrape -> JSON snapshot -> one PDF per chapter.
//! Maps errors to exit codes.

use crate::config;
use crate::orchestrator::{
    scrape_chapters, ChapterRange, RangeError, ScrapeOptions, DEFAULT_CHAPTER_DELAY,
};
use crate::pacing::ThreadSleep;
use crate::pdf::assemble_all;
use crate::scraper::{
    resolve_source, PoliteClient, Source, SourceError, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY,
};
use crate::snapshot::{self, SnapshotError};
use crate::ChapterCollection;
use clap::Parser;
use reqwest::Url;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("Invalid --chapters: {0}")]
    Range(#[from] RangeError),

    #[error("No chapters could be retrieved in range {range}.")]
    NothingScraped { range: String },

    #[error("{0}")]
    Snapshot(#[from] SnapshotError),

    #[error("{failed} of {total} chapter PDF(s) could not be written.")]
    Assemble { failed: usize, total: usize },
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) | CliRunError::Source(_) | CliRunError::Range(_) => 1,
            CliRunError::NothingScraped { .. } => 2,
            CliRunError::Snapshot(_) | CliRunError::Assemble { .. } => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mangapdf")]
#[command(about = "Scrape comic chapters from Drake Scans or Asura Scans and write one PDF per chapter")]
#[command(
    after_help = "Config file keys (output_dir, user_agent, timeout_secs, retry_count, retry_delay_ms, chapter_delay_ms) are read from ./mangapdf.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    /// Series base URL, e.g. https://drakecomic.org/sss-grade-saint-knight. Not needed with --from-snapshot.
    pub url: Option<String>,

    /// Source site (drakescans/1 or asurascans/2). Detected from the URL host when omitted.
    #[arg(long, value_parser = parse_source)]
    pub source: Option<Source>,

    /// Title used to name the output folder and snapshot. Default: last URL path segment.
    #[arg(short, long)]
    pub title: Option<String>,

    /// Chapter range to scrape (1-based inclusive), e.g. 1-10 or 5-5.
    #[arg(long, value_parser = parse_chapter_range)]
    pub chapters: Option<(u32, u32)>,

    /// Root output directory (overrides config; default ./output).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Pause after each chapter in milliseconds (overrides config; default 2000).
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Write the JSON snapshot only; skip PDF generation.
    #[arg(long, conflicts_with = "from_snapshot")]
    pub no_pdf: bool,

    /// Build PDFs from an existing snapshot instead of scraping. PDFs are written next to it.
    #[arg(long)]
    pub from_snapshot: Option<PathBuf>,

    /// Only log warnings and errors; no progress bar.
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and full error chain.
    #[arg(long)]
    pub verbose: bool,
}

fn parse_source(s: &str) -> Result<Source, String> {
    s.parse::<Source>().map_err(|e| e.to_string())
}

fn parse_chapter_range(s: &str) -> Result<(u32, u32), String> {
    let s = s.trim();
    let (from_str, to_str) = s.split_once('-').ok_or_else(|| {
        format!(
            "Invalid --chapters: expected 'from-to' (e.g. 1-10), got '{}'",
            s
        )
    })?;
    let from_str = from_str.trim();
    let to_str = to_str.trim();
    let from: u32 = from_str.parse().map_err(|_| {
        format!(
            "Invalid --chapters: '{}' is not a valid start chapter number",
            from_str
        )
    })?;
    let to: u32 = to_str.parse().map_err(|_| {
        format!(
            "Invalid --chapters: '{}' is not a valid end chapter number",
            to_str
        )
    })?;
    ChapterRange::new(from, to).map_err(|e| format!("Invalid --chapters: {}", e))?;
    Ok((from, to))
}

/// Sanitize a title to a safe folder/file name: lowercase, replace spaces/special with `-`.
fn sanitize_title(title: &str) -> String {
    let mut s = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    while s.contains("--") {
        s = s.replace("--", "-");
    }
    s = s.trim_matches('-').to_string();
    if s.is_empty() {
        s = "manga".to_string();
    }
    s
}

/// Last non-empty path segment of the series URL, or "manga".
fn default_title(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segs| segs.filter(|s| !s.is_empty()).last().map(String::from))
        })
        .unwrap_or_else(|| "manga".to_string())
}

fn init_logging(args: &Args) {
    let filter = if args.verbose {
        "mangapdf=debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    // A second init (e.g. run() called twice in one process) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Settings resolved from CLI flags, then config, then defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    output_root: PathBuf,
    user_agent: Option<String>,
    timeout_secs: u64,
    max_attempts: u32,
    retry_delay: Duration,
    chapter_delay: Duration,
}

fn resolve_settings(args: &Args, config: Option<&config::Config>) -> Settings {
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    Settings {
        output_root: args
            .output_dir
            .clone()
            .or_else(|| config.and_then(|c| c.output_dir.clone()))
            .unwrap_or_else(|| PathBuf::from("output")),
        user_agent: args
            .user_agent
            .clone()
            .or_else(|| config.and_then(|c| c.user_agent.clone())),
        timeout_secs: args
            .timeout
            .or_else(|| config.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
        max_attempts: config
            .and_then(|c| c.retry_count)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS)
            .max(1),
        retry_delay: config
            .and_then(|c| c.retry_delay_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RETRY_DELAY),
        chapter_delay: args
            .delay_ms
            .or_else(|| config.and_then(|c| c.chapter_delay_ms))
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_CHAPTER_DELAY),
    }
}

/// Write one PDF per chapter into `dir`; fail if any document could not be written.
fn write_pdfs(
    client: &mut PoliteClient,
    chapters: &ChapterCollection,
    dir: &Path,
    quiet: bool,
) -> Result<(), CliRunError> {
    let results = assemble_all(client, chapters, dir);
    let total = results.len();
    let failed = results.iter().filter(|r| r.is_err()).count();
    if !quiet {
        for report in results.iter().flatten() {
            eprintln!(
                "Wrote {} ({} pages{})",
                report.path.display(),
                report.pages.len(),
                if report.omitted.is_empty() {
                    String::new()
                } else {
                    format!(", {} omitted", report.omitted.len())
                }
            );
        }
    }
    if failed > 0 {
        return Err(CliRunError::Assemble { failed, total });
    }
    Ok(())
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    init_logging(args);

    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let settings = resolve_settings(args, config.as_ref());

    let mut builder = PoliteClient::builder()
        .timeout_secs(settings.timeout_secs)
        .max_attempts(settings.max_attempts)
        .retry_delay(settings.retry_delay);
    if let Some(ua) = &settings.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    let mut client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    if let Some(snapshot_path) = &args.from_snapshot {
        let chapters = snapshot::load(snapshot_path)?;
        info!(
            "Loaded {} chapter(s) from {}",
            chapters.len(),
            snapshot_path.display()
        );
        let dir = snapshot_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        return write_pdfs(&mut client, &chapters, &dir, args.quiet);
    }

    let url = args.url.as_deref().ok_or_else(|| {
        CliRunError::InvalidInput(
            "Missing series URL. Example: mangapdf https://drakecomic.org/sss-grade-saint-knight --chapters 1-5"
                .to_string(),
        )
    })?;
    let (from, to) = args.chapters.ok_or_else(|| {
        CliRunError::InvalidInput("Missing --chapters FROM-TO (e.g. --chapters 1-10).".to_string())
    })?;
    let range = ChapterRange::new(from, to)?;
    let source = resolve_source(url, args.source)?;
    let title = args.title.clone().unwrap_or_else(|| default_title(url));
    let slug = sanitize_title(&title);
    let out_dir = settings.output_root.join(&slug);
    info!(
        "Scraping {} chapters {} from {} into {}",
        source,
        range,
        url,
        out_dir.display()
    );

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |n: u32, total: u32| {
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new(total as u64);
            if let Ok(style) = indicatif::ProgressStyle::default_bar()
                .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
            {
                bar.set_style(
                    style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                        .progress_chars("█▉▊▋▌▍▎▏ "),
                );
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_position(n as u64);
        pb.set_message(format!("Chapter {}/{}", n, total));
    };
    let progress: Option<&dyn Fn(u32, u32)> = if args.quiet { None } else { Some(&progress_cb) };

    let options = ScrapeOptions {
        range,
        chapter_delay: settings.chapter_delay,
        progress,
    };
    let run = scrape_chapters(&mut client, source, url, &options, &ThreadSleep);

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }

    let snapshot_path = out_dir.join(format!("{}.json", slug));
    snapshot::save(&run.chapters, &snapshot_path)?;
    if !args.quiet {
        eprintln!(
            "Saved {} of {} chapter(s) to {}",
            run.chapters.len(),
            range.count(),
            snapshot_path.display()
        );
    }

    if run.chapters.is_empty() {
        return Err(CliRunError::NothingScraped {
            range: range.to_string(),
        });
    }
    if args.no_pdf {
        return Ok(());
    }
    write_pdfs(&mut client, &run.chapters, &out_dir, args.quiet)
}
