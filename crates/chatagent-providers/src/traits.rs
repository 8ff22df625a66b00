//! LLM provider trait: the boundary between the orchestration loop and a
//! chat-completion backend.
//!
//! The loop depends only on the shape of [`LlmProvider::chat`]; the
//! `HttpProvider` in `http_provider.rs` covers every OpenAI-compatible API.

use async_trait::async_trait;
use chatagent_core::types::{LlmResponse, Message, ToolDefinition};
use thiserror::Error;

/// Sampling parameters passed with each LLM call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    /// Maximum tokens to generate. `None` leaves it to the backend.
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: None,
            temperature: 0.7,
        }
    }
}

/// Backend communication failures.
///
/// These are not recoverable by the agent: they abort the current turn and
/// surface to the user.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no API key configured (set OPENAI_API_KEY or provider.apiKey)")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse completion: {0}")]
    Parse(String),

    #[error("completion contained no choices")]
    EmptyResponse,
}

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages` — Conversation in OpenAI format, system prompt first.
    /// * `tools`    — Optional list of tool definitions the LLM can call.
    /// * `model`    — Model identifier (e.g. `"claude-sonnet-4-5"`, `"gpt-4o"`).
    /// * `config`   — Temperature, max_tokens.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, ProviderError>;

    /// The default model for this provider instance.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
