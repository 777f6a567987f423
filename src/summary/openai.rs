use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::error::SummarizeError;

use super::{Description, Summarizer};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f64 = 0.5;
const DETAILED_MAX_TOKENS: u32 = 200;
const SHORT_MAX_TOKENS: u32 = 30;

pub fn detailed_prompt(command: &str) -> String {
    format!(
        "Write a step by step description of this zsh command line input is doing as if explaining it to another developer: {command} \n"
    )
}

pub fn short_prompt(command: &str) -> String {
    format!("Write a one sentence description of this command line: {command} \n")
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f64,
    n: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Summarizer backed by an OpenAI-compatible chat completions endpoint.
/// Each command costs two requests: the step by step description and the
/// one-sentence summary.
pub struct OpenAiSummarizer {
    client: Client,
    runtime: tokio::runtime::Runtime,
    api_key: String,
    model: String,
    chat_endpoint: String,
}

impl OpenAiSummarizer {
    pub fn try_from_config(config: &OpenAiConfig) -> Result<Self, SummarizeError> {
        let api_key = config.api_key().ok_or(SummarizeError::MissingApiKey)?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SummarizeError::Runtime)?;

        Ok(Self {
            client,
            runtime,
            api_key: api_key.to_string(),
            model: config.model().to_string(),
            chat_endpoint: config.chat_endpoint(),
        })
    }

    async fn describe(&self, command: &str) -> Result<Description, SummarizeError> {
        let detailed = self
            .complete(&detailed_prompt(command), DETAILED_MAX_TOKENS)
            .await?;
        let short = self.complete(&short_prompt(command), SHORT_MAX_TOKENS).await?;
        Ok(Description::new(detailed, short))
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, SummarizeError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: TEMPERATURE,
            n: 1,
        };
        debug!(model = %self.model, max_tokens, "sending completion request");

        let res = self
            .client
            .post(&self.chat_endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SummarizeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = res.json().await?;
        extract_content(&data)
    }

    fn block_on<F: Future>(&self, fut: F) -> F::Output {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => tokio::task::block_in_place(move || handle.block_on(fut)),
            Err(_) => self.runtime.block_on(fut),
        }
    }
}

impl Summarizer for OpenAiSummarizer {
    fn summarize(&self, command: &str) -> Result<Description, SummarizeError> {
        self.block_on(self.describe(command))
    }
}

/// Pull the trimmed text of the first choice out of a chat completion.
fn extract_content(data: &Value) -> Result<String, SummarizeError> {
    data["choices"][0]["message"]["content"]
        .as_str()
        .map(|text| text.trim().to_string())
        .ok_or_else(|| SummarizeError::MalformedResponse(data.to_string()))
}
