//! HTTP provider for OpenAI-compatible chat completion APIs.
//!
//! Talks directly to `{api_base}/chat/completions`. Works with OpenAI itself
//! and with any gateway or local server speaking the same protocol.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, error, info, warn};

use chatagent_core::config::schema::ProviderConfig;
use chatagent_core::types::{
    ChatCompletionRequest, ChatCompletionResponse, LlmResponse, Message, ToolDefinition,
};

use crate::traits::{LlmProvider, LlmRequestConfig, ProviderError};

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// An LLM provider that talks to any OpenAI-compatible HTTP API.
pub struct HttpProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
    /// Default model for this provider instance.
    default_model: String,
    /// Extra headers to send with each request.
    extra_headers: HeaderMap,
    /// Per-exchange counter, used to correlate request/response log lines.
    request_counter: AtomicU64,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl HttpProvider {
    /// Create a new HttpProvider from the provider config.
    pub fn new(config: &ProviderConfig, model: &str) -> Result<Self, ProviderError> {
        let mut extra_headers = HeaderMap::new();
        if let Some(ref headers) = config.extra_headers {
            for (key, value) in headers {
                if let (Ok(name), Ok(val)) = (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    extra_headers.insert(name, val);
                } else {
                    warn!("Invalid header: {}={}", key, value);
                }
            }
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(HttpProvider {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            default_model: model.to_string(),
            extra_headers,
            request_counter: AtomicU64::new(0),
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    fn next_request_id(&self) -> String {
        let n = self.request_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("req_{}", n)
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, ProviderError> {
        let request_id = self.next_request_id();

        info!(
            request_id = %request_id,
            model = %model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Calling LLM"
        );
        for (i, msg) in messages.iter().enumerate() {
            debug!(
                request_id = %request_id,
                index = i,
                role = msg.role(),
                chars = msg.content().map_or(0, |c| c.len()),
                tool_calls = msg.tool_calls().len(),
                "request message"
            );
        }

        let request_body = ChatCompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.map(|t| t.to_vec()),
            tool_choice: tools.map(|_| "auto".to_string()),
            max_tokens: config.max_tokens,
            temperature: Some(config.temperature),
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .headers(self.extra_headers.clone())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(request_id = %request_id, error = %e, "HTTP request failed");
                ProviderError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(request_id = %request_id, status = %status, body = %body, "API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            error!(request_id = %request_id, error = %e, "Failed to parse LLM response");
            ProviderError::Parse(e.to_string())
        })?;

        let llm_resp = parsed.into_first().ok_or(ProviderError::EmptyResponse)?;
        info!(
            request_id = %request_id,
            has_content = llm_resp.content.as_deref().is_some_and(|c| !c.is_empty()),
            tool_calls = llm_resp.tool_calls.len(),
            finish_reason = llm_resp.finish_reason.as_deref().unwrap_or("?"),
            total_tokens = llm_resp.usage.as_ref().map_or(0, |u| u.total_tokens),
            "LLM response received"
        );
        for call in &llm_resp.tool_calls {
            debug!(
                request_id = %request_id,
                id = %call.id,
                tool = %call.function.name,
                arguments = %call.function.arguments,
                "tool call requested"
            );
        }
        Ok(llm_resp)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        "OpenAI-compatible"
    }
}

// ─────────────────────────────────────────────
// Builder (convenience)
// ─────────────────────────────────────────────

/// Build an HttpProvider for `model` from the provider config.
///
/// Fails early when no API key is configured, before any request is made.
pub fn create_provider(config: &ProviderConfig, model: &str) -> Result<HttpProvider, ProviderError> {
    if !config.is_configured() {
        return Err(ProviderError::MissingApiKey);
    }

    debug!(model = model, api_base = %config.api_base, "Creating LLM provider");
    HttpProvider::new(config, model)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_config(api_key: &str, api_base: &str) -> ProviderConfig {
        ProviderConfig {
            api_key: api_key.to_string(),
            api_base: api_base.to_string(),
            extra_headers: None,
        }
    }

    // ── Unit tests ──

    #[test]
    fn test_completions_url_trailing_slash() {
        let config = make_config("key", "https://api.openai.com/v1/");
        let provider = HttpProvider::new(&config, "gpt-4o").unwrap();
        assert_eq!(
            provider.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_ids_increase() {
        let provider = HttpProvider::new(&make_config("key", "http://x"), "gpt-4o").unwrap();
        assert_eq!(provider.next_request_id(), "req_1");
        assert_eq!(provider.next_request_id(), "req_2");
    }

    #[test]
    fn test_extra_headers() {
        let mut headers = HashMap::new();
        headers.insert("X-App-Code".to_string(), "my-app-code".to_string());
        let config = ProviderConfig {
            api_key: "key".to_string(),
            api_base: "http://x".to_string(),
            extra_headers: Some(headers),
        };
        let provider = HttpProvider::new(&config, "gpt-4o").unwrap();
        assert!(provider.extra_headers.contains_key("x-app-code"));
    }

    #[test]
    fn test_create_provider_requires_key() {
        let err = create_provider(&make_config("", "http://x"), "gpt-4").unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey));

        let provider = create_provider(&make_config("sk-1", "http://x"), "gpt-4").unwrap();
        assert_eq!(provider.default_model(), "gpt-4");
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_chat_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-test",
                "choices": [{
                    "message": { "content": "Hello! I'm ChatAgent.", "tool_calls": null },
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
            })))
            .mount(&mock_server)
            .await;

        let config = make_config("test-key-123", &mock_server.uri());
        let provider = HttpProvider::new(&config, "gpt-4o").unwrap();

        let messages = vec![Message::system("You are ChatAgent."), Message::user("Hello")];
        let resp = provider
            .chat(&messages, None, "gpt-4o", &LlmRequestConfig::default())
            .await
            .unwrap();

        assert_eq!(resp.content.as_deref(), Some("Hello! I'm ChatAgent."));
        assert!(!resp.has_tool_calls());
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_chat_with_tool_calls() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({ "tool_choice": "auto" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-tools",
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [
                            {
                                "id": "call_a",
                                "type": "function",
                                "function": { "name": "read_file", "arguments": "{\"file_path\": \"a\"}" }
                            },
                            {
                                "id": "call_b",
                                "type": "function",
                                "function": { "name": "read_file", "arguments": "{\"file_path\": \"b\"}" }
                            }
                        ]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": null
            })))
            .mount(&mock_server)
            .await;

        let provider = HttpProvider::new(&make_config("key", &mock_server.uri()), "gpt-4o").unwrap();
        let tool_def = ToolDefinition::new(
            "read_file",
            "Read a file",
            serde_json::json!({"type": "object", "properties": {"file_path": {"type": "string"}}}),
        );

        let resp = provider
            .chat(
                &[Message::user("Read a and b")],
                Some(&[tool_def]),
                "gpt-4o",
                &LlmRequestConfig::default(),
            )
            .await
            .unwrap();

        assert!(resp.content.is_none());
        let ids: Vec<&str> = resp.tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["call_a", "call_b"]);
    }

    #[tokio::test]
    async fn test_chat_api_error_is_returned() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit exceeded", "type": "rate_limit_error" }
            })))
            .mount(&mock_server)
            .await;

        let provider = HttpProvider::new(&make_config("key", &mock_server.uri()), "gpt-4o").unwrap();
        let err = provider
            .chat(&[Message::user("Hello")], None, "gpt-4o", &LlmRequestConfig::default())
            .await
            .unwrap_err();

        match err {
            ProviderError::Api { status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("Rate limit"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_network_error() {
        // Point to a port that's not listening
        let provider = HttpProvider::new(&make_config("key", "http://127.0.0.1:1"), "gpt-4o").unwrap();
        let err = provider
            .chat(&[Message::user("Hello")], None, "gpt-4o", &LlmRequestConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Http(_)));
    }

    #[tokio::test]
    async fn test_chat_empty_choices() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "x", "choices": [], "usage": null
            })))
            .mount(&mock_server)
            .await;

        let provider = HttpProvider::new(&make_config("key", &mock_server.uri()), "gpt-4o").unwrap();
        let err = provider
            .chat(&[Message::user("Hello")], None, "gpt-4o", &LlmRequestConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_chat_sends_correct_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek-chat",
                "max_tokens": 1024,
                "temperature": 0.2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-body",
                "choices": [{ "message": { "content": "ok" }, "finish_reason": "stop" }],
                "usage": null
            })))
            .mount(&mock_server)
            .await;

        let provider =
            HttpProvider::new(&make_config("ds-key", &mock_server.uri()), "deepseek-chat").unwrap();
        let req_config = LlmRequestConfig {
            max_tokens: Some(1024),
            temperature: 0.2,
        };

        // If the body matcher fails, wiremock returns 404 → Api error
        let resp = provider
            .chat(&[Message::user("test")], None, "deepseek-chat", &req_config)
            .await
            .unwrap();
        assert_eq!(resp.content.as_deref(), Some("ok"));
    }
}
