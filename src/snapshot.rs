//! JSON snapshot of every chapter scraped in a run.
//!
//! One file per run, a pretty-printed array of
//! `{chapterNumber, title, images: [{url, page}]}`. Saving overwrites.

use crate::model::ChapterCollection;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Cannot write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Write `collection` to `path`, replacing any previous snapshot.
/// The parent directory is created if missing.
pub fn save(collection: &ChapterCollection, path: &Path) -> Result<(), SnapshotError> {
    let write_err = |source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }
    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    write_json(collection, &mut writer, path)?;
    writer.flush().map_err(write_err)?;
    info!(
        "All chapter data ({} chapters) saved to {}",
        collection.len(),
        path.display()
    );
    Ok(())
}

/// Pretty JSON plus a trailing newline. Failures of the underlying writer are I/O errors.
fn write_json<W: Write>(
    collection: &ChapterCollection,
    writer: &mut W,
    path: &Path,
) -> Result<(), SnapshotError> {
    serde_json::to_writer_pretty(&mut *writer, collection).map_err(|e| {
        if e.is_io() {
            SnapshotError::Write {
                path: path.to_path_buf(),
                source: e.into(),
            }
        } else {
            SnapshotError::Json {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    writer.write_all(b"\n").map_err(|e| SnapshotError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read a snapshot written by [save].
pub fn load(path: &Path) -> Result<ChapterCollection, SnapshotError> {
    let file = File::open(path).map_err(|e| SnapshotError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| SnapshotError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}
