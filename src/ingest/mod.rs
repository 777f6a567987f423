pub mod tail;
pub mod zsh;

use chrono::{DateTime, Local};

/// Display format for execution timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One parsed shell-history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    /// Raw epoch seconds from the history line.
    pub epoch: i64,
    pub executed_at: DateTime<Local>,
    /// Duration token as written by the shell (seconds).
    pub duration: String,
    pub command: String,
}

impl HistoryRecord {
    /// Local-time rendering of `executed_at`.
    pub fn timestamp_display(&self) -> String {
        self.executed_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Why a line did not produce a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Line lacks the record marker (continuation line or noise).
    NoMarker,
    /// Fewer than two non-empty colon-delimited fields.
    MissingFields,
    /// Timestamp field is not an integer, or out of range.
    BadTimestamp,
    /// No `;` between duration and command.
    MissingSeparator,
    /// Nothing after the `;`.
    EmptyCommand,
}

impl SkipReason {
    /// Continuation lines of multi-line commands are expected noise; every
    /// other reason means a malformed entry.
    pub fn is_continuation(self) -> bool {
        matches!(self, SkipReason::NoMarker)
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoMarker => write!(f, "no record marker"),
            SkipReason::MissingFields => write!(f, "missing fields"),
            SkipReason::BadTimestamp => write!(f, "bad timestamp"),
            SkipReason::MissingSeparator => write!(f, "missing ';' separator"),
            SkipReason::EmptyCommand => write!(f, "empty command"),
        }
    }
}

/// A line that could not be parsed on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFragment {
    pub line: String,
    pub reason: SkipReason,
}

/// Result of parsing one history line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(HistoryRecord),
    Skipped(SkippedFragment),
}

impl ParseOutcome {
    pub fn record(&self) -> Option<&HistoryRecord> {
        match self {
            ParseOutcome::Parsed(record) => Some(record),
            ParseOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ParseOutcome::Skipped(_))
    }
}
