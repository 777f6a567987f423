use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reading the tailed history file.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("failed to stat {}: {source}", path.display())]
    Stat { path: PathBuf, source: io::Error },

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
}

/// Failures touching the daily output files.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to archive {} to {}: {reason}", from.display(), to.display())]
    Archive {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
}

/// Failures from the summarization collaborator.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    MalformedResponse(String),

    #[error("failed to start HTTP runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("{0}")]
    Other(String),
}
