//! Anthropic Messages API client

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CompletionRequest, LanguageModel, LlmError};

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const USER_AGENT: &str = concat!("bookfactory-ct/", env!("CARGO_PKG_VERSION"));

/// Anthropic API client
#[derive(Clone)]
pub struct AnthropicClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root (proxy, gateway)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| LlmError::Config(format!("Invalid API key: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn build_api_request<'a>(&'a self, request: &'a CompletionRequest) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: request.system.as_deref(),
            messages: vec![ApiMessage {
                role: "user",
                content: &request.prompt,
            }],
        }
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let headers = self.build_headers()?;
        let api_request = self.build_api_request(&request);

        tracing::debug!(
            model = %self.model,
            max_tokens = request.max_tokens,
            prompt_chars = request.prompt.chars().count(),
            "Sending completion request"
        );

        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        tracing::debug!(
            input_tokens = api_response.usage.input_tokens,
            output_tokens = api_response.usage.output_tokens,
            "Completion received"
        );

        Ok(api_response.text())
    }
}

// ============================================================================
// API types (internal)
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiContent>,
    #[serde(default)]
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContent {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize, Default)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl ApiResponse {
    /// Concatenate all text blocks
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ApiContent::Text { text } => Some(text.as_str()),
                ApiContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = AnthropicClient::new("test_key", "claude-test");
        assert!(client.is_ok());
        assert_eq!(client.unwrap().model_name(), "claude-test");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = AnthropicClient::new("k", "m")
            .unwrap()
            .with_base_url("http://localhost:9000/v1/");
        assert_eq!(client.base_url, "http://localhost:9000/v1");
    }

    #[test]
    fn test_request_body_shape() {
        let client = AnthropicClient::new("k", "claude-test").unwrap();
        let request = CompletionRequest {
            system: Some("be terse".to_string()),
            prompt: "check this".to_string(),
            max_tokens: 2000,
        };
        let body = serde_json::to_value(client.build_api_request(&request)).unwrap();

        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["system"], "be terse");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "check this");
    }

    #[test]
    fn test_invalid_header_key_rejected() {
        let client = AnthropicClient::new("bad\nkey", "m").unwrap();
        assert!(matches!(client.build_headers(), Err(LlmError::Config(_))));
    }

    #[test]
    fn test_response_text_skips_non_text_blocks() {
        let response: ApiResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "thinking", "thinking": "hmm"},
                    {"type": "text", "text": "[1,"},
                    {"type": "text", "text": "2]"}
                ],
                "usage": {"input_tokens": 10, "output_tokens": 4}
            }"#,
        )
        .unwrap();
        assert_eq!(response.text(), "[1,2]");
    }
}
