//! Walk a date-partitioned heatmap archive and fan decoded records into
//! a sink.
//!
//! Layout on disk is `<root>/YYYY-MM-DD/<N>` where `N` is a half-hour
//! slot index. A root without date-named children is treated as a single
//! partition. File-local failures are logged and skipped; sink failures
//! abort the batch.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use log::{debug, error, info, warn};

use heatmap_core::pipeline;

use crate::db::{LoadError, RecordSink};

/// Half-hour slots per day: file names `0` through `47`.
const MAX_SLOT: u32 = 47;

/// Per-file outcome for the end-of-run summary.
#[derive(Debug)]
pub struct FileStats {
    pub path: PathBuf,
    pub frames: u64,
    pub records: u64,
    pub downsampled: u64,
    pub elapsed_secs: f64,
}

/// Whole-batch outcome.
#[derive(Debug, Default)]
pub struct BatchStats {
    pub files: Vec<FileStats>,
    pub total_records: u64,
}

/// Process every partition under `root`, streaming records into `sink`.
/// With `cleanup` set, source files are deleted after the walk completes
/// without a sink failure.
pub async fn process_directory(
    root: &Path,
    sink: &dyn RecordSink,
    cleanup: bool,
) -> Result<BatchStats, LoadError> {
    if !root.is_dir() {
        error!("directory does not exist: {}", root.display());
        return Ok(BatchStats::default());
    }

    let mut stats = BatchStats::default();
    let mut processed = Vec::new();

    for dir in date_partitions(root) {
        info!("processing directory: {}", dir.display());

        let files = slot_files(&dir);
        if files.is_empty() {
            warn!("no valid data files found in {}", dir.display());
            continue;
        }

        for path in files {
            let started = Instant::now();

            let decoded = match pipeline::decode_file(&path) {
                Ok(d) => d,
                Err(e) => {
                    error!("error parsing file {}: {e}", path.display());
                    continue;
                }
            };

            if !decoded.records.is_empty() {
                sink.append_rows(&decoded.records).await?;
            }

            let elapsed = started.elapsed().as_secs_f64();
            info!(
                "inserted {} records from {} in {elapsed:.2} seconds",
                decoded.records.len(),
                path.display()
            );

            stats.total_records += decoded.records.len() as u64;
            stats.files.push(FileStats {
                path: path.clone(),
                frames: decoded.frames,
                records: decoded.records.len() as u64,
                downsampled: decoded.downsampled,
                elapsed_secs: elapsed,
            });

            if cleanup {
                processed.push(path);
            }
        }
    }

    if cleanup && !processed.is_empty() {
        info!("cleaning up {} processed files", processed.len());
        for path in &processed {
            match fs::remove_file(path) {
                Ok(()) => debug!("deleted {}", path.display()),
                Err(e) => error!("failed to delete {}: {e}", path.display()),
            }
        }
    }

    Ok(stats)
}

/// Immediate children named like a calendar date, sorted lexicographically
/// (chronological for ISO dates). Falls back to the root itself when no
/// date-named child exists.
fn date_partitions(root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.len() == 10 && NaiveDate::parse_from_str(name, "%Y-%m-%d").is_ok() {
                dirs.push(path);
            }
        }
    }

    if dirs.is_empty() {
        return vec![root.to_path_buf()];
    }
    dirs.sort();
    dirs
}

/// Files whose basename is a decimal slot index in `[0, 47]`, sorted by
/// numeric value.
fn slot_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<(u32, PathBuf)> = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            if let Ok(slot) = name.parse::<u32>() {
                if slot <= MAX_SLOT {
                    files.push((slot, path));
                }
            }
        }
    }

    files.sort_by_key(|(slot, _)| *slot);
    files.into_iter().map(|(_, path)| path).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
