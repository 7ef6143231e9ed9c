//! Completion client — every LLM call in the gateway goes through here.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint. The model is
//! hardcoded; the base URL and key come from configuration so tests and
//! per-tenant deployments can point elsewhere.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backends::{Backend, BackendError};
use crate::errors::AppError;
use crate::request::GenerationRequest;

const PROVIDER: &str = "completion";
/// The model used for all completion calls.
pub const MODEL: &str = "gemini-2.0-flash";
const TEMPERATURE: f32 = 0.7;
const COMPLETION_TIMEOUT_SECS: u64 = 120;

/// Output cap for blog-title generation.
pub const BLOG_TITLE_MAX_TOKENS: u32 = 100;
/// Output cap for résumé reviews.
pub const RESUME_REVIEW_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    /// Extracts the first completion's text.
    pub fn text(&self) -> Option<&str> {
        self.choices.first()?.message.content.as_deref()
    }
}

/// HTTP client for the completion provider. No retry logic: completion
/// calls are billed per request, so a failure is surfaced immediately.
#[derive(Clone)]
pub struct CompletionClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl CompletionClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(COMPLETION_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            api_key,
        }
    }

    /// Single-turn completion: one user message, bounded output length.
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, BackendError> {
        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| BackendError::transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                detail,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::transport(PROVIDER, e))?;

        let text = chat.text().ok_or(BackendError::Empty { provider: PROVIDER })?;
        debug!("Completion call succeeded ({} chars)", text.len());

        Ok(text.to_string())
    }
}

/// Text-completion backend for article and blog-title generation.
/// Articles pass the caller-specified length through untruncated; blog
/// titles are capped at a fixed 100 tokens.
pub struct TextCompletion {
    client: Arc<CompletionClient>,
}

impl TextCompletion {
    pub fn new(client: Arc<CompletionClient>) -> Self {
        Self { client }
    }

    fn max_tokens_for(request: &GenerationRequest) -> Option<u32> {
        match request {
            GenerationRequest::Article { length, .. } => Some(*length),
            GenerationRequest::BlogTitle { .. } => Some(BLOG_TITLE_MAX_TOKENS),
            _ => None,
        }
    }
}

#[async_trait]
impl Backend for TextCompletion {
    fn validate(&self, request: &GenerationRequest) -> Result<(), AppError> {
        match request {
            GenerationRequest::Article { prompt, length } => {
                if prompt.trim().is_empty() {
                    return Err(AppError::Validation("prompt cannot be empty".to_string()));
                }
                if *length == 0 {
                    return Err(AppError::Validation(
                        "length must be at least 1".to_string(),
                    ));
                }
                Ok(())
            }
            GenerationRequest::BlogTitle { prompt } => {
                if prompt.trim().is_empty() {
                    return Err(AppError::Validation("prompt cannot be empty".to_string()));
                }
                Ok(())
            }
            _ => Err(BackendError::KindMismatch.into()),
        }
    }

    async fn execute(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let max_tokens = Self::max_tokens_for(request).ok_or(BackendError::KindMismatch)?;
        let prompt = match request {
            GenerationRequest::Article { prompt, .. }
            | GenerationRequest::BlogTitle { prompt } => prompt,
            _ => return Err(BackendError::KindMismatch),
        };

        self.client.complete(prompt, max_tokens).await
    }
}
