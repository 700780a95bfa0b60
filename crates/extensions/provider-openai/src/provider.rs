//! OpenAI oracle implementations.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use clinsim_protocols::{Embedder, Embedding, LanguageModel, OracleError};

use crate::api::{
    ChatMessage, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Shared configuration for the chat and embedding oracles.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub temperature: f32,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            temperature: 0.2,
        }
    }

    /// Point at an OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }
}

fn build_client() -> Result<reqwest::Client, OracleError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| OracleError::Network(e.to_string()))
}

fn transport_error(e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::Timeout(REQUEST_TIMEOUT_SECS)
    } else {
        OracleError::Network(e.to_string())
    }
}

async fn error_from_response(response: reqwest::Response) -> OracleError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let message = response.text().await.unwrap_or_default();
    match status {
        401 | 403 => OracleError::AuthenticationFailed(message),
        429 => OracleError::RateLimited {
            retry_after_seconds: retry_after.unwrap_or(60),
        },
        400 => OracleError::InvalidRequest(message),
        _ => OracleError::ApiError { status, message },
    }
}

/// Chat-completion oracle.
pub struct OpenAiChat {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: OpenAiConfig) -> Result<Self, OracleError> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.chat_model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(self.config.temperature),
            max_tokens: None,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    fn id(&self) -> &str {
        &self.config.chat_model
    }

    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let request = self.build_request(prompt);
        debug!(model = %request.model, prompt_chars = prompt.chars().count(), "chat request");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::InvalidResponse("no choices in response".to_string()))?;
        choice
            .message
            .content
            .ok_or_else(|| OracleError::InvalidResponse("empty message content".to_string()))
    }
}

/// Embedding oracle.
pub struct OpenAiEmbedder {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiConfig) -> Result<Self, OracleError> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn id(&self) -> &str {
        &self.config.embedding_model
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding, OracleError> {
        // The API rejects empty input.
        let input = if text.trim().is_empty() { "None" } else { text };
        let request = EmbeddingRequest {
            model: self.config.embedding_model.clone(),
            input: input.to_string(),
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
        let data = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::InvalidResponse("no embedding in response".to_string()))?;
        Ok(Embedding::new(data.embedding))
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
