//! Provider wire adapters
//!
//! Each provider implements [`ProviderApi`], which knows how to build that
//! provider's listing and completion requests and where the answer lives in
//! its response. The prober itself is provider-agnostic.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use anyhow::Result;
use serde_json::Value;

use crate::transport::HttpRequest;
use crate::types::{ProviderConfig, ProviderKind};

pub use anthropic::AnthropicApi;
pub use gemini::GeminiApi;
pub use openai::OpenAiApi;

/// Provider-specific request builders and response extractors
pub trait ProviderApi: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Cheap authenticated call that validates the key without inference
    fn availability_request(&self, config: &ProviderConfig, api_key: &str) -> Result<HttpRequest>;

    /// One completion for `prompt` against `model`
    fn completion_request(
        &self,
        config: &ProviderConfig,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> Result<HttpRequest>;

    /// Generated text from a success payload, if the payload has the expected shape
    fn extract_text(&self, body: &Value) -> Option<String>;

    /// Model identifiers from the availability endpoint's payload
    fn extract_models(&self, body: &Value) -> Vec<String>;
}

static GEMINI: GeminiApi = GeminiApi;
static OPENAI: OpenAiApi = OpenAiApi;
static ANTHROPIC: AnthropicApi = AnthropicApi;

/// Adapter for a provider kind
pub fn api_for(kind: ProviderKind) -> &'static dyn ProviderApi {
    match kind {
        ProviderKind::Gemini => &GEMINI,
        ProviderKind::OpenAi => &OPENAI,
        ProviderKind::Claude => &ANTHROPIC,
    }
}

/// String at a JSON pointer
pub(crate) fn text_at(body: &Value, pointer: &str) -> Option<String> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `data[].id`, the listing shape shared by OpenAI and Anthropic
pub(crate) fn data_ids(body: &Value) -> Vec<String> {
    body.get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_for_matches_kind() {
        for kind in ProviderKind::ALL {
            assert_eq!(api_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_text_at() {
        let body = json!({"a": [{"b": "hello"}], "n": 3});
        assert_eq!(text_at(&body, "/a/0/b"), Some("hello".to_string()));
        assert_eq!(text_at(&body, "/a/1/b"), None);
        assert_eq!(text_at(&body, "/n"), None);
    }

    #[test]
    fn test_data_ids_skips_malformed_entries() {
        let body = json!({"data": [{"id": "m1"}, {"name": "no-id"}, {"id": 7}, {"id": "m2"}]});
        assert_eq!(data_ids(&body), vec!["m1", "m2"]);
        assert!(data_ids(&json!({"models": []})).is_empty());
    }
}
