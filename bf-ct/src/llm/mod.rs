//! Language model access
//!
//! The checker only needs "send a prompt, get text back". That contract is
//! the [`LanguageModel`] trait; [`AnthropicClient`] implements it against
//! the Anthropic Messages API and tests substitute scripted models.

pub mod anthropic;

pub use anthropic::AnthropicClient;

use async_trait::async_trait;
use thiserror::Error;

/// Language model errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Language model API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// A single-turn completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logging
    fn model_name(&self) -> &str;

    /// Return the model's text reply to `request`
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

/// Stand-in used when no API key is configured
///
/// The service still starts; every consistency check fails with
/// [`LlmError::NoApiKey`].
pub struct UnconfiguredModel;

#[async_trait]
impl LanguageModel for UnconfiguredModel {
    fn model_name(&self) -> &str {
        "unconfigured"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
        Err(LlmError::NoApiKey)
    }
}
