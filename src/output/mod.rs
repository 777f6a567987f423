//! Daily output files.
//!
//! One markdown file per local calendar day lives in the output directory.
//! When a new day's file is first created, files left over from earlier days
//! are moved into the archive directory under their original names.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::error::OutputError;

const FILE_PREFIX: &str = "zsh_history_";
const FILE_EXTENSION: &str = "md";
const DATE_KEY_FORMAT: &str = "%m-%d-%Y";

/// The output file for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyOutputFile {
    pub date_key: NaiveDate,
    pub path: PathBuf,
}

/// Resolves, creates and archives daily output files.
#[derive(Debug, Clone)]
pub struct OutputFileManager {
    output_dir: PathBuf,
    archive_dir: PathBuf,
}

impl OutputFileManager {
    pub fn new(output_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            archive_dir: archive_dir.into(),
        }
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// The file that records executed at `now` belong to (not created).
    pub fn daily_file(&self, now: DateTime<Local>) -> DailyOutputFile {
        let date_key = now.date_naive();
        DailyOutputFile {
            date_key,
            path: self.output_dir.join(file_name_for(date_key)),
        }
    }

    /// Resolve today's file, creating it if absent. Creating a new day's
    /// file first archives files from other days. Archival problems are
    /// logged and never prevent the path from being returned.
    pub fn resolve_active_file(&self, now: DateTime<Local>) -> Result<PathBuf, OutputError> {
        let daily = self.daily_file(now);
        if daily.path.exists() {
            return Ok(daily.path);
        }

        for err in self.archive_stale(now) {
            warn!("{err}");
        }

        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&daily.path)
            .map_err(|source| OutputError::Write {
                path: daily.path.clone(),
                source,
            })?;
        info!(path = %daily.path.display(), "started daily output file");
        Ok(daily.path)
    }

    /// Move every active daily file whose date differs from `now`'s into the
    /// archive directory. Returns the failures; files already archived are
    /// no longer in the output directory and are not seen again.
    pub fn archive_stale(&self, now: DateTime<Local>) -> Vec<OutputError> {
        let today = now.date_naive();
        let mut failures = Vec::new();

        for (path, date_key) in self.active_files() {
            if date_key == today {
                continue;
            }
            match self.archive_one(&path) {
                Ok(target) => info!(
                    from = %path.display(),
                    to = %target.display(),
                    "archived daily output file"
                ),
                Err(err) => failures.push(err),
            }
        }

        failures
    }

    /// Daily files currently in the output directory, sorted by date.
    pub fn active_files(&self) -> Vec<(PathBuf, NaiveDate)> {
        let entries = match fs::read_dir(&self.output_dir) {
            Ok(e) => e,
            Err(err) => {
                debug!(dir = %self.output_dir.display(), "cannot list output dir: {err}");
                return Vec::new();
            }
        };

        let mut files: Vec<(PathBuf, NaiveDate)> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if !path.is_file() {
                    return None;
                }
                let date_key = date_key_from_name(path.file_name()?.to_str()?)?;
                Some((path, date_key))
            })
            .collect();
        files.sort_by_key(|(_, date_key)| *date_key);
        files
    }

    fn archive_one(&self, path: &Path) -> Result<PathBuf, OutputError> {
        let file_name = path.file_name().unwrap_or_default();
        let target = self.archive_dir.join(file_name);
        let failure = |reason: String| OutputError::Archive {
            from: path.to_path_buf(),
            to: target.clone(),
            reason,
        };

        if !self.archive_dir.is_dir() {
            return Err(failure("archive directory does not exist".to_string()));
        }
        if target.exists() {
            return Err(failure("target already exists".to_string()));
        }
        fs::rename(path, &target).map_err(|e| failure(e.to_string()))?;
        Ok(target)
    }
}

/// Append one rendered block plus a blank-line separator and flush it to disk.
pub fn append_block(path: &Path, block: &str) -> Result<(), OutputError> {
    let write_err = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_err)?;
    file.write_all(block.as_bytes()).map_err(write_err)?;
    file.write_all(b"\n\n").map_err(write_err)?;
    file.flush().map_err(write_err)?;
    file.sync_data().map_err(write_err)?;
    Ok(())
}

/// `zsh_history_<MM-DD-YYYY>.md`
pub fn file_name_for(date_key: NaiveDate) -> String {
    format!(
        "{FILE_PREFIX}{}.{FILE_EXTENSION}",
        date_key.format(DATE_KEY_FORMAT)
    )
}

/// Inverse of [`file_name_for`]; `None` for anything else in the directory.
pub fn date_key_from_name(name: &str) -> Option<NaiveDate> {
    let stem = name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?
        .strip_suffix('.')?;
    NaiveDate::parse_from_str(stem, DATE_KEY_FORMAT).ok()
}
