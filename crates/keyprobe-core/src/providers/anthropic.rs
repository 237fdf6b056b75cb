//! Anthropic Claude messages API

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use super::{ProviderApi, data_ids, text_at};
use crate::transport::HttpRequest;
use crate::types::{ProviderConfig, ProviderKind};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Used when a config explicitly clears `max_tokens`
const FALLBACK_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicApi;

impl AnthropicApi {
    fn authed(request: HttpRequest, api_key: &str) -> HttpRequest {
        request
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }
}

impl ProviderApi for AnthropicApi {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn availability_request(&self, config: &ProviderConfig, api_key: &str) -> Result<HttpRequest> {
        Ok(Self::authed(
            HttpRequest::get(format!("{}/v1/models", config.base_url())),
            api_key,
        ))
    }

    fn completion_request(
        &self,
        config: &ProviderConfig,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> Result<HttpRequest> {
        let body = AnthropicRequest {
            model,
            max_tokens: config.max_tokens().unwrap_or(FALLBACK_MAX_TOKENS),
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        Ok(Self::authed(
            HttpRequest::post(
                format!("{}/v1/messages", config.base_url()),
                serde_json::to_value(&body)?,
            ),
            api_key,
        ))
    }

    fn extract_text(&self, body: &Value) -> Option<String> {
        text_at(body, "/content/0/text")
    }

    fn extract_models(&self, body: &Value) -> Vec<String> {
        data_ids(body)
    }
}

// ── Anthropic wire types ──

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> ProviderConfig {
        ProviderConfig::new(ProviderKind::Claude, Some("sk-ant-test".to_string()))
    }

    #[test]
    fn test_availability_headers() {
        let req = AnthropicApi.availability_request(&config(), "sk-ant-test").unwrap();
        assert_eq!(req.url, "https://api.anthropic.com/v1/models");
        assert_eq!(req.header_value("x-api-key"), Some("sk-ant-test"));
        assert_eq!(req.header_value("anthropic-version"), Some("2023-06-01"));
        assert_eq!(req.header_value("authorization"), None);
    }

    #[test]
    fn test_completion_request_shape() {
        let req = AnthropicApi
            .completion_request(&config(), "sk-ant-test", "claude-x", "Hello")
            .unwrap();
        assert_eq!(req.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(req.header_value("x-api-key"), Some("sk-ant-test"));
        assert_eq!(
            req.body,
            Some(json!({
                "model": "claude-x",
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": "Hello"}]
            }))
        );
    }

    #[test]
    fn test_max_tokens_always_sent() {
        let cfg = config().with_max_tokens(None);
        let req = AnthropicApi.completion_request(&cfg, "k", "claude-x", "x").unwrap();
        assert_eq!(req.body.unwrap()["max_tokens"], FALLBACK_MAX_TOKENS);

        let cfg = config().with_max_tokens(Some(16));
        let req = AnthropicApi.completion_request(&cfg, "k", "claude-x", "x").unwrap();
        assert_eq!(req.body.unwrap()["max_tokens"], 16);
    }

    #[test]
    fn test_extract_text() {
        let body = json!({
            "id": "msg_1",
            "type": "message",
            "content": [{"type": "text", "text": "Hi there"}],
            "stop_reason": "end_turn"
        });
        assert_eq!(AnthropicApi.extract_text(&body), Some("Hi there".to_string()));

        let error = json!({"type": "error", "error": {"type": "not_found_error", "message": "model: claude-x"}});
        assert_eq!(AnthropicApi.extract_text(&error), None);
    }

    #[test]
    fn test_extract_models() {
        let body = json!({"data": [{"id": "claude-3-5-haiku-latest", "type": "model"}], "has_more": false});
        assert_eq!(AnthropicApi.extract_models(&body), vec!["claude-3-5-haiku-latest"]);
    }
}
