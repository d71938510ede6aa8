//! OpenAI-compatible chat-completions client.
//!
//! Works against OpenAI itself, OpenRouter, and any gateway exposing
//! `POST {base_url}/chat/completions` with bearer authentication.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::llm::types::{ChatRequest, ChatResponse, Message, ResponseFormat, Usage};

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Default per-request HTTP timeout.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for one chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// Label used in errors and logs (e.g. `"openrouter"`).
    pub provider: String,
    pub api_key: String,
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    pub default_model: String,
    /// Default maximum tokens per response.
    pub max_tokens: u32,
    /// HTTP timeout for a whole request.
    pub timeout: Duration,
}

impl LlmClientConfig {
    pub fn new(
        provider: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: default_model.into(),
            max_tokens: 4096,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Non-streaming chat-completions client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: Arc<LlmClientConfig>,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a client. Fails when the API key is empty.
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(AgentError::MissingApiKey {
                provider: config.provider.clone(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    pub fn provider(&self) -> &str {
        &self.config.provider
    }

    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Send a chat request and wait for the whole reply.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let body = self.build_request_body(request);
        let resp = self.send_request(&body).await?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(AgentError::LlmRequestFailed {
                reason: format!("API returned {status}: {text}"),
            });
        }

        let v: Value = serde_json::from_str(&text).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("invalid JSON response: {e}"),
        })?;

        parse_response(&v)
    }

    /// Build the JSON body for `POST /chat/completions`.
    fn build_request_body(&self, request: &ChatRequest) -> Value {
        let model = if request.model.is_empty() {
            self.config.default_model.as_str()
        } else {
            request.model.as_str()
        };

        let mut body = json!({
            "model": model,
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "messages": messages_to_wire(&request.messages),
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        if request.response_format != ResponseFormat::Text {
            body["response_format"] = json!({"type": request.response_format.as_str()});
        }

        body
    }

    async fn send_request(&self, body: &Value) -> Result<reqwest::Response> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("invalid authorization header: {e}"),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!(url = %url, model = %body["model"], provider = %self.config.provider, "sending LLM request");

        self.http
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Wire format helpers
// ---------------------------------------------------------------------------

/// Convert messages into the `messages` array.
pub fn messages_to_wire(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect()
}

/// Extract the first choice's text from a chat-completions response.
pub fn parse_response(v: &Value) -> Result<ChatResponse> {
    let message = &v["choices"][0]["message"];

    if message.is_null() {
        return Err(AgentError::LlmParseFailed {
            reason: "missing `choices[0].message` in response".into(),
        });
    }

    let usage = v
        .get("usage")
        .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok());

    Ok(ChatResponse {
        content: message["content"].as_str().unwrap_or_default().to_owned(),
        model: v["model"].as_str().map(str::to_owned),
        usage,
    })
}

/// Remove a surrounding markdown code fence (```` ``` ```` or
/// ```` ```json ````) if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> LlmClient {
        LlmClient::new(LlmClientConfig::new(
            "openai",
            "sk-test",
            "https://api.openai.com/v1",
            "gpt-4o",
        ))
        .unwrap()
    }

    #[test]
    fn empty_api_key_returns_error() {
        let err = LlmClient::new(LlmClientConfig::new("openrouter", "", "http://x", "m")).unwrap_err();
        assert!(matches!(err, AgentError::MissingApiKey { provider } if provider == "openrouter"));
    }

    #[test]
    fn request_body_uses_defaults() {
        let body = client().build_request_body(&ChatRequest::new("sys", "hi"));
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert!(body.get("temperature").is_none());
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn request_body_json_mode_and_overrides() {
        let request = ChatRequest {
            model: "anthropic/claude-3.5-sonnet".into(),
            ..ChatRequest::new("sys", "hi")
        }
        .with_temperature(0.5)
        .with_max_tokens(1500)
        .json_mode();
        let body = client().build_request_body(&request);
        assert_eq!(body["model"], "anthropic/claude-3.5-sonnet");
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn parse_text_response() {
        let v = json!({
            "model": "gpt-4o",
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2}
        });
        let resp = parse_response(&v).unwrap();
        assert_eq!(resp.content, "hello");
        assert_eq!(resp.model.as_deref(), Some("gpt-4o"));
        assert_eq!(resp.usage.unwrap().completion_tokens, 2);
    }

    #[test]
    fn parse_missing_choices_fails() {
        assert!(parse_response(&json!({"error": "nope"})).is_err());
    }

    #[test]
    fn null_content_is_empty() {
        let v = json!({"choices": [{"message": {"role": "assistant", "content": null}}]});
        assert_eq!(parse_response(&v).unwrap().content, "");
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{}"), "{}");
    }
}
