use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::GenerationSection;

mod prompts;

pub use prompts::{comment_prompt, summary_prompt};

/// Reply meaning "leave this post alone".
pub const SKIP_SENTINEL: &str = "[SKIP]";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no text")]
    EmptyResponse,
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("environment variable {0} is not set")]
    MissingApiKey(String),
}

/// Raw prompt-in, text-out access to a language model.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentDecision {
    Skip,
    Comment(String),
}

impl CommentDecision {
    pub fn from_reply(reply: &str) -> Self {
        let reply = reply.trim();
        if reply == SKIP_SENTINEL {
            CommentDecision::Skip
        } else {
            CommentDecision::Comment(reply.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommentRequest<'a> {
    pub author: &'a str,
    pub content: &'a str,
    pub voice_directive: &'a str,
}

#[async_trait]
pub trait CommentGenerator: Send + Sync {
    async fn comment(&self, request: CommentRequest<'_>)
        -> Result<CommentDecision, GenerationError>;

    /// Thematic digest of the given post contents.
    async fn summarize(&self, contents: &str) -> Result<String, GenerationError>;
}

/// [`CommentGenerator`] that renders the engagement prompts and sends them
/// to a [`TextModel`] under a deadline.
pub struct PromptedGenerator {
    model: Arc<dyn TextModel>,
    deadline: Duration,
}

impl PromptedGenerator {
    pub fn new(model: Arc<dyn TextModel>, deadline: Duration) -> Self {
        Self { model, deadline }
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        match timeout(self.deadline, self.model.complete(prompt)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(target: "llm", "timeout after {:?}", self.deadline);
                Err(GenerationError::Timeout(self.deadline))
            }
        }
    }
}

#[async_trait]
impl CommentGenerator for PromptedGenerator {
    async fn comment(
        &self,
        request: CommentRequest<'_>,
    ) -> Result<CommentDecision, GenerationError> {
        let prompt = comment_prompt(request.voice_directive, request.author, request.content);
        let reply = self.complete(&prompt).await?;
        Ok(CommentDecision::from_reply(&reply))
    }

    async fn summarize(&self, contents: &str) -> Result<String, GenerationError> {
        let reply = self.complete(&summary_prompt(contents)).await?;
        Ok(reply.trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|part| part.text).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Gemini `generateContent` over HTTPS.
pub struct GeminiModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl GeminiModel {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            temperature,
        }
    }

    pub fn from_config(config: &GenerationSection) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| GenerationError::MissingApiKey(config.api_key_env.clone()))?;
        Ok(Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
            config.temperature,
        ))
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };
        debug!(target: "llm", model = %self.model, chars = prompt.len(), "sending prompt");
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body = response.bytes().await?;
        let parsed: GenerateResponse = serde_json::from_slice(&body)?;
        parsed.into_text().ok_or(GenerationError::EmptyResponse)
    }
}
