//! Google Gemini (Generative Language API)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{ProviderApi, text_at};
use crate::transport::HttpRequest;
use crate::types::{ProviderConfig, ProviderKind};

const MODEL_PREFIX: &str = "models/";

/// Gemini authenticates with `?key=` on every URL
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiApi;

impl GeminiApi {
    fn keyed_url(base: &str, api_key: &str) -> Result<String> {
        let url = Url::parse_with_params(base, &[("key", api_key)])
            .with_context(|| format!("Invalid Gemini endpoint: {}", base))?;
        Ok(url.into())
    }
}

/// Model ids from the listing come back as `models/<id>`
pub fn strip_model_prefix(model: &str) -> &str {
    model.strip_prefix(MODEL_PREFIX).unwrap_or(model)
}

impl ProviderApi for GeminiApi {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn availability_request(&self, config: &ProviderConfig, api_key: &str) -> Result<HttpRequest> {
        let url = Self::keyed_url(&format!("{}/v1/models", config.base_url()), api_key)?;
        Ok(HttpRequest::get(url))
    }

    fn completion_request(
        &self,
        config: &ProviderConfig,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> Result<HttpRequest> {
        let url = Self::keyed_url(
            &format!(
                "{}/v1beta/{}{}:generateContent",
                config.base_url(),
                MODEL_PREFIX,
                strip_model_prefix(model)
            ),
            api_key,
        )?;

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: config.max_tokens().map(|max| GeminiGenerationConfig {
                max_output_tokens: max,
            }),
        };

        Ok(HttpRequest::post(url, serde_json::to_value(&body)?))
    }

    fn extract_text(&self, body: &Value) -> Option<String> {
        text_at(body, "/candidates/0/content/parts/0/text")
    }

    fn extract_models(&self, body: &Value) -> Vec<String> {
        let Ok(list) = GeminiModelList::deserialize(body) else {
            return Vec::new();
        };
        list.models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .as_ref()
                    .is_none_or(|methods| methods.iter().any(|x| x == "generateContent"))
            })
            .map(|m| strip_model_prefix(&m.name).to_string())
            .collect()
    }
}

// ── Gemini wire types ──

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiModelList {
    #[serde(default)]
    models: Vec<GeminiModel>,
}

#[derive(Debug, Deserialize)]
struct GeminiModel {
    name: String,
    #[serde(rename = "supportedGenerationMethods")]
    supported_generation_methods: Option<Vec<String>>,
}
