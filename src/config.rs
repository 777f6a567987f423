use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Chat endpoint path segment.
const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Default base URL for OpenAI-compatible APIs.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

/// Default model used when none is provided.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const DEFAULT_SOURCE: &str = "~/.history/history/.zsh_history";
pub const DEFAULT_OUTPUT_DIR: &str = "~/.history/data";
pub const DEFAULT_ARCHIVE_DIR: &str = "~/.history/history";
pub const DEFAULT_API_KEY_FILE: &str = "~/.ai.key";
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub queue_capacity: usize,
    /// `None` selects the passthrough summarizer.
    pub openai: Option<OpenAiConfig>,
}

/// Credentials and endpoint for the summarization service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiConfig {
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiConfig {
    pub fn new(api_key: Option<String>, base_url: Option<String>, model: Option<String>) -> Self {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: sanitize_base_url(base_url),
            model,
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn chat_endpoint(&self) -> String {
        let trimmed = self.base_url.trim_end_matches('/');
        if trimmed.ends_with(CHAT_COMPLETIONS_PATH) {
            trimmed.to_string()
        } else {
            format!("{trimmed}/{CHAT_COMPLETIONS_PATH}")
        }
    }

    /// Fill in the key only if none is set yet.
    pub fn or_api_key(mut self, api_key: Option<String>) -> Self {
        if self.api_key.is_none() {
            self.api_key = api_key.filter(|k| !k.trim().is_empty());
        }
        self
    }
}

fn sanitize_base_url(base_url: Option<String>) -> String {
    base_url
        .and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.trim_end_matches('/').to_string())
            }
        })
        .unwrap_or_else(|| DEFAULT_BASE_URL.trim_end_matches('/').to_string())
}

/// Read an API key stored alone in a file. A missing file is `Ok(None)`.
pub fn read_api_key_file(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let key = contents.trim();
            Ok((!key.is_empty()).then(|| key.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
