//! The tail pipeline: change notification -> read -> parse -> summarize ->
//! format -> append.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, error, info, trace, warn};

use crate::events::{NotificationQueue, Wakeup};
use crate::ingest::tail::TailCursor;
use crate::ingest::{zsh, HistoryRecord, ParseOutcome};
use crate::output::{append_block, OutputFileManager};
use crate::summary::format::SummaryFormatter;
use crate::summary::Summarizer;

/// Where the controller is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Reading,
    Parsing,
    Summarizing,
    Appending,
}

/// Outcome counts for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records written to the daily file.
    pub appended: usize,
    /// Lines that were not records.
    pub skipped: usize,
    /// Records lost to summarizer or write failures.
    pub failed: usize,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.appended == 0 && self.skipped == 0 && self.failed == 0
    }
}

pub struct TailController {
    cursor: TailCursor,
    output: OutputFileManager,
    summarizer: Box<dyn Summarizer + Send>,
    formatter: Box<dyn SummaryFormatter + Send>,
    state: CycleState,
}

impl TailController {
    pub fn new(
        cursor: TailCursor,
        output: OutputFileManager,
        summarizer: Box<dyn Summarizer + Send>,
        formatter: Box<dyn SummaryFormatter + Send>,
    ) -> Self {
        Self {
            cursor,
            output,
            summarizer,
            formatter,
            state: CycleState::Idle,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn cursor(&self) -> &TailCursor {
        &self.cursor
    }

    /// Run one cycle against the wall clock.
    pub fn handle_change(&mut self) -> CycleReport {
        self.handle_change_at(Local::now())
    }

    /// Run one cycle, resolving the daily file for `now`. Failures are
    /// logged per record and never abort the rest of the chunk.
    pub fn handle_change_at(&mut self, now: DateTime<Local>) -> CycleReport {
        let mut report = CycleReport::default();

        self.transition(CycleState::Reading);
        let chunk = match self.cursor.read_new() {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("{e}");
                self.transition(CycleState::Idle);
                return report;
            }
        };
        if chunk.is_empty() {
            self.transition(CycleState::Idle);
            return report;
        }

        self.transition(CycleState::Parsing);
        for outcome in zsh::parse_chunk(&chunk) {
            match outcome {
                ParseOutcome::Parsed(record) => {
                    if self.process_record(&record, now) {
                        report.appended += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                ParseOutcome::Skipped(fragment) => {
                    if fragment.reason.is_continuation() {
                        debug!(line = %fragment.line, "skipped continuation line");
                    } else {
                        warn!(reason = %fragment.reason, line = %fragment.line, "skipped malformed history line");
                    }
                    report.skipped += 1;
                }
            }
        }

        self.transition(CycleState::Idle);
        if report.appended > 0 || report.failed > 0 {
            info!(
                appended = report.appended,
                skipped = report.skipped,
                failed = report.failed,
                "cycle complete"
            );
        }
        report
    }

    /// Summarize, render and append one record. Returns whether it was written.
    fn process_record(&mut self, record: &HistoryRecord, now: DateTime<Local>) -> bool {
        self.transition(CycleState::Summarizing);
        let description = match self.summarizer.summarize(&record.command) {
            Ok(d) => d,
            Err(e) => {
                warn!(command = %record.command, "summarization failed: {e}");
                return false;
            }
        };

        self.transition(CycleState::Appending);
        let block = self.formatter.render(record, &description);
        let written = self
            .output
            .resolve_active_file(now)
            .and_then(|path| append_block(&path, &block).map(|()| path));
        match written {
            Ok(path) => {
                debug!(path = %path.display(), command = %record.command, "appended entry");
                true
            }
            Err(e) => {
                error!(command = %record.command, "{e}");
                false
            }
        }
    }

    fn transition(&mut self, next: CycleState) {
        trace!(from = ?self.state, to = ?next, "cycle state");
        self.state = next;
    }

    /// Worker loop: one cycle per (coalesced) wakeup until shutdown.
    pub fn run(mut self, queue: NotificationQueue, shutdown: Arc<AtomicBool>) {
        info!(path = %self.cursor.source_path().display(), "tail worker started");
        loop {
            match queue.next() {
                Wakeup::Shutdown => break,
                Wakeup::Changed { coalesced } => {
                    if shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    trace!(coalesced, "change notification");
                    self.handle_change();
                }
            }
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
        }
        info!("tail worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SummarizeError;
    use crate::events::{forward, TailEvent};
    use crate::summary::format::MarkdownFormatter;
    use crate::summary::{Description, PassthroughSummarizer};
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, Instant};

    struct FailOn(&'static str);

    impl Summarizer for FailOn {
        fn summarize(&self, command: &str) -> Result<Description, SummarizeError> {
            if command == self.0 {
                Err(SummarizeError::Other("stub failure".into()))
            } else {
                Ok(Description::new(command, command))
            }
        }
    }

    fn setup(summarizer: Box<dyn Summarizer + Send>) -> (tempfile::TempDir, PathBuf, TailController) {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join(".zsh_history");
        let out = tmp.path().join("data");
        let archive = tmp.path().join("history");
        fs::create_dir_all(&out).unwrap();
        fs::create_dir_all(&archive).unwrap();
        fs::write(&source, ": 1600000000:0;before start\n").unwrap();

        let controller = TailController::new(
            TailCursor::at_end(&source).unwrap(),
            OutputFileManager::new(out, archive),
            summarizer,
            Box::new(MarkdownFormatter::default()),
        );
        (tmp, source, controller)
    }

    fn append(path: &Path, text: &str) {
        let mut f = fs::OpenOptions::new().append(true).open(path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_no_new_bytes_is_noop() {
        let (_tmp, _source, mut controller) = setup(Box::new(PassthroughSummarizer));
        let report = controller.handle_change();
        assert!(report.is_empty());
        assert_eq!(controller.state(), CycleState::Idle);
    }

    #[test]
    fn test_failed_record_does_not_drop_batch() {
        let (_tmp, source, mut controller) = setup(Box::new(FailOn("bad")));
        append(&source, ": 1700000000:0;bad\n: 1700000001:0;good\ncontinuation\n");

        let report = controller.handle_change();
        assert_eq!(
            report,
            CycleReport {
                appended: 1,
                skipped: 1,
                failed: 1
            }
        );
        assert_eq!(controller.state(), CycleState::Idle);
    }

    #[test]
    fn test_existing_content_is_never_processed() {
        let (tmp, source, mut controller) = setup(Box::new(PassthroughSummarizer));
        append(&source, ": 1700000000:0;after start\n");
        controller.handle_change();

        let manager = OutputFileManager::new(tmp.path().join("data"), tmp.path().join("history"));
        let (path, _) = manager.active_files().pop().unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("after start"));
        assert!(!text.contains("before start"));
    }

    #[test]
    fn test_run_coalesces_burst_then_stops() {
        let (tmp, source, controller) = setup(Box::new(PassthroughSummarizer));
        let manager = OutputFileManager::new(tmp.path().join("data"), tmp.path().join("history"));
        let queue = NotificationQueue::bounded(4);
        let tx = queue.sender();
        let shutdown = Arc::new(AtomicBool::new(false));

        append(&source, ": 1700000000:0;ls\n");
        for _ in 0..3 {
            forward(&tx, TailEvent::SourceChanged(source.clone()));
        }

        let flag = shutdown.clone();
        let worker = std::thread::spawn(move || controller.run(queue, flag));

        let entries = || -> usize {
            manager
                .active_files()
                .iter()
                .filter_map(|(path, _)| fs::read_to_string(path).ok())
                .map(|text| text.lines().filter(|l| l.starts_with("# ")).count())
                .sum()
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        while entries() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }

        shutdown.store(true, Ordering::SeqCst);
        forward(&tx, TailEvent::Shutdown);
        worker.join().unwrap();

        assert_eq!(entries(), 1);
        assert_eq!(manager.active_files().len(), 1);
    }
}
