//! Text generation through a hosted chat-completions API.
//!
//! One request per call: no retries, no streaming. Failures come back as
//! [`GenerationError`] carrying the upstream message; it is up to the caller
//! to decide what (if anything) of it reaches an end user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::GenerationError;
use crate::models::{Chunk, ScoredChunk};

/// A single-turn completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Something that turns a prompt into text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

/// Generated answer plus the chunks that were in its prompt.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub used_chunks: Vec<Chunk>,
}

/// Generate an answer for an already-composed prompt.
///
/// `chunks` are the retrieved chunks the prompt was built from; they are
/// returned unchanged as `used_chunks`.
pub async fn generate(
    model: &dyn ChatModel,
    settings: &GenerationConfig,
    prompt: &str,
    chunks: &[ScoredChunk],
    api_key: Option<&str>,
) -> Result<Generation, GenerationError> {
    let api_key = api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or(GenerationError::MissingApiKey)?;

    let request = CompletionRequest {
        prompt: prompt.to_string(),
        api_key: api_key.trim().to_string(),
        model: settings.model.clone(),
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    };
    let text = model.complete(&request).await?;

    Ok(Generation {
        text: text.trim().to_string(),
        used_chunks: chunks.iter().map(|sc| sc.chunk.clone()).collect(),
    })
}

/// [`ChatModel`] backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAIChatModel {
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIChatModel {
    pub fn new(settings: &GenerationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&text),
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no choices returned".to_string()))
    }
}

/// Pull `error.message` out of an OpenAI error body, falling back to the raw text.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
