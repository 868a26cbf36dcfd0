//! Chat model clients.
//!
//! | Config `llm.provider` | Client | Endpoint |
//! |-----------------------|--------|----------|
//! | `"ollama"` | [`OllamaChat`] | `POST {url}/api/chat` (`stream: false`) |
//! | `"openai"` | [`OpenAiChat`] | `POST {url}/v1/chat/completions` |
//!
//! Both send the rendered prompt as a single user message and return the
//! assistant message text. Calls are not retried: a failed answer falls
//! back to a fixed message one level up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::ModelError;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

/// A language model that completes a fully rendered prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<AssistantMessage>,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}

/// Chat client for a local Ollama server.
pub struct OllamaChat {
    client: reqwest::Client,
    model: String,
    url: String,
    temperature: Option<f32>,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self, ModelError> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            model: config.model.clone(),
            url: url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let endpoint = format!("{}/api/chat", self.url);
        let body = OllamaChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: self.temperature.map(|temperature| OllamaOptions { temperature }),
        };

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|source| ModelError::Request {
                url: endpoint.clone(),
                source,
            })?;
        let parsed: OllamaChatResponse = decode(response).await?;

        parsed
            .message
            .map(|m| m.content)
            .ok_or(ModelError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: AssistantMessage,
}

/// Chat client for an OpenAI-compatible `/v1/chat/completions` API.
///
/// Sends `OPENAI_API_KEY` as a bearer token when it is set; local
/// OpenAI-compatible servers usually need none.
pub struct OpenAiChat {
    client: reqwest::Client,
    model: String,
    url: String,
    api_key: Option<String>,
    temperature: Option<f32>,
}

impl OpenAiChat {
    pub fn new(config: &LlmConfig) -> Result<Self, ModelError> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            model: config.model.clone(),
            url: url.trim_end_matches('/').to_string(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let endpoint = format!("{}/v1/chat/completions", self.url);
        let body = OpenAiChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let mut request = self.client.post(&endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.trim());
        }
        let response = request
            .send()
            .await
            .map_err(|source| ModelError::Request {
                url: endpoint.clone(),
                source,
            })?;
        let parsed: OpenAiChatResponse = decode(response).await?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ModelError::EmptyResponse)
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ModelError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(ModelError::Client)
}

async fn decode<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, ModelError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        return Err(ModelError::Api {
            status: status.as_u16(),
            body,
        });
    }
    response.json().await.map_err(ModelError::Decode)
}

/// Build the chat client selected by `llm.provider`.
pub fn create_chat_model(config: &LlmConfig) -> anyhow::Result<Box<dyn ChatModel>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(OllamaChat::new(config)?)),
        "openai" => Ok(Box::new(OpenAiChat::new(config)?)),
        other => anyhow::bail!("Unknown llm provider: {}", other),
    }
}
