//! OpenAI chat completions

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use super::{ProviderApi, data_ids, text_at};
use crate::transport::HttpRequest;
use crate::types::{ProviderConfig, ProviderKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiApi;

impl ProviderApi for OpenAiApi {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn availability_request(&self, config: &ProviderConfig, api_key: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::get(format!("{}/v1/models", config.base_url()))
            .header("authorization", format!("Bearer {}", api_key)))
    }

    fn completion_request(
        &self,
        config: &ProviderConfig,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> Result<HttpRequest> {
        let body = OpenAiRequest {
            model,
            messages: vec![OpenAiMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: config.max_tokens(),
        };

        Ok(HttpRequest::post(
            format!("{}/v1/chat/completions", config.base_url()),
            serde_json::to_value(&body)?,
        )
        .header("authorization", format!("Bearer {}", api_key)))
    }

    fn extract_text(&self, body: &Value) -> Option<String> {
        text_at(body, "/choices/0/message/content")
    }

    fn extract_models(&self, body: &Value) -> Vec<String> {
        data_ids(body)
    }
}

// ── OpenAI wire types ──

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}
