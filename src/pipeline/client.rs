//! Model clients: send one prompt (optionally with an image) and return the
//! model's text.
//!
//! [`ModelClient`] is the seam both passes are written against. Two
//! implementations ship with the crate:
//!
//! * [`AnthropicClient`]: a direct `POST /v1/messages` call with `reqwest`.
//!   The key is a constructor argument, so a missing credential fails before
//!   any socket is opened.
//! * [`ProviderClient`]: wraps any `edgequake_llm` provider, so OpenAI,
//!   Gemini, Ollama and friends can serve the same pipeline.
//!
//! One attempt per call. A failure carries the upstream body.

use crate::config::AnalysisConfig;
use crate::error::WineLabelError;
use crate::pipeline::prepare::PreparedImage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A single model call.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Natural-language instruction.
    pub prompt: String,
    /// Attached before the prompt when present.
    pub image: Option<PreparedImage>,
}

/// Anything that can turn a [`ModelRequest`] into model text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Issue the call and return the first text segment of the reply.
    async fn complete(&self, request: &ModelRequest) -> Result<String, WineLabelError>;
}

// ── Anthropic Messages API ───────────────────────────────────────────────

/// Connection settings for [`AnthropicClient`].
#[derive(Clone)]
pub struct AnthropicSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub version: String,
}

impl AnthropicSettings {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            version: config.anthropic_version.clone(),
        }
    }
}

/// Direct client for the Anthropic Messages API.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    endpoint: String,
    version: String,
}

impl AnthropicClient {
    /// Build a client. Fails with [`WineLabelError::MissingApiKey`] when no
    /// non-blank key is given.
    pub fn new(settings: AnthropicSettings) -> Result<Self, WineLabelError> {
        let api_key = settings
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| WineLabelError::MissingApiKey {
                hint: "Set ANTHROPIC_API_KEY or pass --api-key.".into(),
            })?;

        Ok(Self {
            client: Client::new(),
            api_key,
            endpoint: format!("{}/v1/messages", settings.base_url.trim_end_matches('/')),
            version: settings.version,
        })
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Build the JSON body for a request. Image block first, then the prompt.
fn messages_body(request: &ModelRequest) -> MessagesRequest<'_> {
    let mut content = Vec::with_capacity(2);
    if let Some(ref image) = request.image {
        content.push(ContentBlock::Image {
            source: ImageSource {
                kind: "base64",
                media_type: &image.media_type,
                data: &image.data,
            },
        });
    }
    content.push(ContentBlock::Text {
        text: &request.prompt,
    });

    MessagesRequest {
        model: &request.model,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        messages: vec![Message {
            role: "user",
            content,
        }],
    }
}

/// First `text` block of a Messages API response body.
fn first_text(body: &str) -> Option<String> {
    let parsed: MessagesResponse = serde_json::from_str(body).ok()?;
    parsed
        .content
        .into_iter()
        .find(|b| b.kind == "text")
        .and_then(|b| b.text)
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, WineLabelError> {
        debug!(
            model = %request.model,
            max_tokens = request.max_tokens,
            with_image = request.image.is_some(),
            "Sending request to Anthropic"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.version)
            .header("content-type", "application/json")
            .json(&messages_body(request))
            .send()
            .await
            .map_err(|e| WineLabelError::Transport {
                detail: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| WineLabelError::Transport {
            detail: format!("reading response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(WineLabelError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        first_text(&body).ok_or(WineLabelError::EmptyResponse { body })
    }
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// Serves model calls through an `edgequake_llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ModelClient for ProviderClient {
    fn name(&self) -> &str {
        "edgequake-llm"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, WineLabelError> {
        let images: Vec<ImageData> = request
            .image
            .iter()
            .map(|img| ImageData::new(img.data.clone(), img.media_type.as_str()))
            .collect();
        let messages = vec![ChatMessage::user_with_images(request.prompt.as_str(), images)];

        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens as usize),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| WineLabelError::Transport {
                detail: format!("{e}"),
            })?;

        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(WineLabelError::EmptyResponse {
                body: response.content,
            });
        }
        Ok(response.content)
    }
}
