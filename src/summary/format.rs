//! Rendering of summarized history records into the daily journal.

use crate::ingest::HistoryRecord;

use super::Description;

/// Trait for rendering a summarized record.
/// Implement this trait to add new output layouts.
pub trait SummaryFormatter {
    fn render(&self, record: &HistoryRecord, description: &Description) -> String;
}

/// Markdown block: heading, fenced command, execution line, description.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    /// Info string on the command fence.
    pub fence_language: String,
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self {
            fence_language: "zsh".to_string(),
        }
    }
}

impl SummaryFormatter for MarkdownFormatter {
    fn render(&self, record: &HistoryRecord, description: &Description) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", description.short));

        output.push_str(&format!("```{}\n", self.fence_language));
        output.push_str(&record.command);
        output.push_str("\n```\n\n");

        output.push_str(&format!(
            "* *Executed on:* {} ({}s):\n\n",
            record.timestamp_display(),
            record.duration
        ));

        output.push_str("## Description:\n");
        output.push_str(&format!("* {}", description.detailed));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Local};

    fn record(command: &str) -> HistoryRecord {
        HistoryRecord {
            epoch: 1700000000,
            executed_at: DateTime::from_timestamp(1700000000, 0)
                .unwrap()
                .with_timezone(&Local),
            duration: "5".to_string(),
            command: command.to_string(),
        }
    }

    #[test]
    fn test_render_layout() {
        let rec = record("echo hello");
        let desc = Description::new("Prints hello to stdout.", "Echo hello");
        let output = MarkdownFormatter::default().render(&rec, &desc);

        let expected = format!(
            "# Echo hello\n\n```zsh\necho hello\n```\n\n* *Executed on:* {} (5s):\n\n## Description:\n* Prints hello to stdout.",
            rec.timestamp_display()
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn test_render_keeps_multiline_description() {
        let desc = Description::new("1. lists files\n2. long format", "List files");
        let output = MarkdownFormatter::default().render(&record("ls -l"), &desc);
        assert!(output.ends_with("* 1. lists files\n2. long format"));
    }

    #[test]
    fn test_custom_fence_language() {
        let formatter = MarkdownFormatter {
            fence_language: "sh".to_string(),
        };
        let output = formatter.render(&record("pwd"), &Description::new("d", "s"));
        assert!(output.contains("```sh\npwd\n```"));
    }
}
