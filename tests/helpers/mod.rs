use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use tempfile::TempDir;

use zsh_history_tail::controller::TailController;
use zsh_history_tail::error::SummarizeError;
use zsh_history_tail::ingest::tail::TailCursor;
use zsh_history_tail::output::OutputFileManager;
use zsh_history_tail::summary::format::MarkdownFormatter;
use zsh_history_tail::summary::{Description, Summarizer};

/// Summarizer that always answers with the same description.
pub struct FixedSummarizer {
    pub detailed: &'static str,
    pub short: &'static str,
}

impl Summarizer for FixedSummarizer {
    fn summarize(&self, _command: &str) -> Result<Description, SummarizeError> {
        Ok(Description::new(self.detailed, self.short))
    }
}

/// Summarizer that fails for one command and echoes every other one.
pub struct FailingOn(pub &'static str);

impl Summarizer for FailingOn {
    fn summarize(&self, command: &str) -> Result<Description, SummarizeError> {
        if command == self.0 {
            return Err(SummarizeError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(Description::new(format!("Runs {command}."), command))
    }
}

/// Temp layout: `<tmp>/.zsh_history`, `<tmp>/data`, `<tmp>/history`.
pub struct Fixture {
    _tmp: TempDir,
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub archive_dir: PathBuf,
}

impl Fixture {
    /// Create the layout with `initial` already in the history file.
    pub fn new(initial: &str) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join(".zsh_history");
        let output_dir = tmp.path().join("data");
        let archive_dir = tmp.path().join("history");
        fs::create_dir_all(&output_dir).unwrap();
        fs::create_dir_all(&archive_dir).unwrap();
        fs::write(&source, initial).unwrap();
        Self {
            _tmp: tmp,
            source,
            output_dir,
            archive_dir,
        }
    }

    pub fn manager(&self) -> OutputFileManager {
        OutputFileManager::new(&self.output_dir, &self.archive_dir)
    }

    /// Controller whose cursor starts at the current end of the history file.
    pub fn controller(&self, summarizer: impl Summarizer + Send + 'static) -> TailController {
        TailController::new(
            TailCursor::at_end(&self.source).unwrap(),
            self.manager(),
            Box::new(summarizer),
            Box::new(MarkdownFormatter::default()),
        )
    }

    pub fn append(&self, text: &str) {
        let mut f = fs::OpenOptions::new().append(true).open(&self.source).unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }
}

/// Noon local time on the given date.
pub fn local_noon(year: i32, month: u32, day: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .unwrap()
}

/// Number of journal entries (top-level headings) in a file.
pub fn entry_count(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|text| text.lines().filter(|l| l.starts_with("# ")).count())
        .unwrap_or(0)
}
