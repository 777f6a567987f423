pub mod format;
pub mod openai;

use crate::error::SummarizeError;

/// Natural-language explanation of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    /// Multi-line, step by step.
    pub detailed: String,
    /// One sentence.
    pub short: String,
}

impl Description {
    pub fn new(detailed: impl Into<String>, short: impl Into<String>) -> Self {
        Self {
            detailed: detailed.into(),
            short: short.into(),
        }
    }
}

/// Trait for summarization backends.
/// Calls block until the description is available.
pub trait Summarizer {
    fn summarize(&self, command: &str) -> Result<Description, SummarizeError>;
}

/// Uses the command text itself as both descriptions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSummarizer;

impl Summarizer for PassthroughSummarizer {
    fn summarize(&self, command: &str) -> Result<Description, SummarizeError> {
        Ok(Description::new(command, command))
    }
}
