//! Parser for zsh `EXTENDED_HISTORY` lines.
//!
//! Each record starts with the marker and reads
//! `: <epoch>:<duration>;<command>`. Multi-line commands continue on lines
//! without the marker; those come back as skipped fragments and are not
//! reattached to the record above them.

use chrono::{DateTime, Local};

use super::{HistoryRecord, ParseOutcome, SkipReason, SkippedFragment};

/// Leading character of a history record line.
pub const RECORD_MARKER: char = ':';

/// Parse a chunk of history text into outcomes, one per non-blank line,
/// in input order.
pub fn parse_chunk(chunk: &str) -> Vec<ParseOutcome> {
    chunk.lines().filter_map(parse_line).collect()
}

/// Parse a single line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<ParseOutcome> {
    if line.trim().is_empty() {
        return None;
    }
    let outcome = match parse_record(line) {
        Ok(record) => ParseOutcome::Parsed(record),
        Err(reason) => ParseOutcome::Skipped(SkippedFragment {
            line: line.to_string(),
            reason,
        }),
    };
    Some(outcome)
}

fn parse_record(line: &str) -> Result<HistoryRecord, SkipReason> {
    if !line.starts_with(RECORD_MARKER) {
        return Err(SkipReason::NoMarker);
    }

    // Split on the first two colons only; the command keeps any of its own.
    let fields: Vec<&str> = line
        .splitn(3, ':')
        .filter(|field| !field.trim().is_empty())
        .collect();
    if fields.len() < 2 {
        return Err(SkipReason::MissingFields);
    }

    let epoch: i64 = fields[0]
        .trim()
        .parse()
        .map_err(|_| SkipReason::BadTimestamp)?;
    let executed_at = DateTime::from_timestamp(epoch, 0)
        .map(|utc| utc.with_timezone(&Local))
        .ok_or(SkipReason::BadTimestamp)?;

    let (duration, command) = fields[1]
        .split_once(';')
        .ok_or(SkipReason::MissingSeparator)?;
    let command = command.trim();
    if command.is_empty() {
        return Err(SkipReason::EmptyCommand);
    }

    Ok(HistoryRecord {
        epoch,
        executed_at,
        duration: duration.trim().to_string(),
        command: command.to_string(),
    })
}
