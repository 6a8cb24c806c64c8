use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::http::{build_client, classify_error, describe_failure, FailureKind, IntegrationError};
use crate::config::OpenAiConfig;
use crate::workflows::intake::{CompletionClient, CompletionError};

const SYSTEM_PROMPT: &str = "You are a legal intake analyst for a personal injury practice. \
Answer with a single JSON object and no surrounding prose.";

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiCompletionClient {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompletionClient {
    pub fn new(config: OpenAiConfig, timeout: std::time::Duration) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

impl CompletionClient for OpenAiCompletionClient {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: 0.2,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .map_err(|error| to_completion_error(classify_error(&error), error.to_string()))?;

        if !response.status().is_success() {
            let (kind, detail) = describe_failure(response);
            return Err(to_completion_error(kind, detail));
        }

        // Malformed envelopes are retried.
        let body: ChatResponse = response
            .json()
            .map_err(|error| CompletionError::Transient(format!("unreadable completion: {error}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::Transient("completion had no content".to_string()))?;

        tracing::debug!(model = %self.config.model, chars = content.len(), "completion received");
        Ok(content)
    }
}

fn to_completion_error(kind: FailureKind, detail: String) -> CompletionError {
    match kind {
        FailureKind::Transient => CompletionError::Transient(detail),
        FailureKind::Permanent => CompletionError::Permanent(detail),
    }
}
