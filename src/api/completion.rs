use serde::{Deserialize, Serialize};

use super::{http_client, json_body, transport_error};
use crate::core::config::LlmConfig;
use crate::core::error::UpstreamError;

const SERVICE: &str = "language model";

pub const TITLE_INSTRUCTION: &str =
    "Extract the movie title from the following string and return exactly the movie title nothing more";

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Chat-completion client used to pull a clean title out of a torrent name
pub struct CompletionClient {
    client: reqwest::Client,
    endpoint: String,
    config: LlmConfig,
}

impl CompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: http_client(config.timeout)?,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            config: config.clone(),
        })
    }

    pub fn request_for<'a>(&'a self, raw_title: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: TITLE_INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content: raw_title,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            frequency_penalty: self.config.frequency_penalty,
            presence_penalty: self.config.presence_penalty,
        }
    }

    /// Ask the model for the title and return the first completion, trimmed
    pub async fn extract_title(&self, raw_title: &str) -> Result<String, UpstreamError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_for(raw_title))
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let body = json_body(SERVICE, response).await?;
        let parsed: ChatResponse =
            serde_json::from_value(body).map_err(|e| UpstreamError::Malformed {
                service: SERVICE,
                message: e.to_string(),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|title| !title.is_empty())
            .ok_or(UpstreamError::MissingCompletion { service: SERVICE })
    }
}
