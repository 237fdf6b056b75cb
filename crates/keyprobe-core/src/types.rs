//! Provider identities, per-provider configuration and probe results

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// Model name recorded for attempts that never reached a real model
pub const NO_MODEL: &str = "None";

/// Discovered models tried after the configured list, at most
pub const DEFAULT_DISCOVERY_LIMIT: usize = 3;

/// The hosted LLM providers keyprobe knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Claude,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::Gemini, Self::OpenAi, Self::Claude];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Claude => "claude",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::OpenAi => "https://api.openai.com",
            Self::Claude => "https://api.anthropic.com",
        }
    }

    /// Candidate models in preference order
    pub fn default_models(&self) -> Vec<String> {
        let models: &[&str] = match self {
            Self::Gemini => &["gemini-1.5-flash", "gemini-1.5-pro", "gemini-pro"],
            Self::OpenAi => &["gpt-4o-mini", "gpt-4o", "gpt-3.5-turbo"],
            Self::Claude => &[
                "claude-3-5-haiku-latest",
                "claude-3-5-sonnet-latest",
                "claude-3-haiku-20240307",
            ],
        };
        models.iter().map(|m| m.to_string()).collect()
    }

    /// Messages API rejects requests without `max_tokens`
    pub fn default_max_tokens(&self) -> Option<u32> {
        match self {
            Self::Claude => Some(1024),
            _ => None,
        }
    }

    /// Gemini model availability varies by key and region, so ask the API
    pub fn default_discovery(&self) -> bool {
        matches!(self, Self::Gemini)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "claude" | "anthropic" => Ok(Self::Claude),
            other => Err(format!(
                "unknown provider '{}' (expected gemini, openai or claude)",
                other
            )),
        }
    }
}

/// Everything the prober needs to reach one provider.
///
/// Built once at startup and never mutated; use the `with_*` builders to
/// derive a variant.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    kind: ProviderKind,
    api_key: Option<String>,
    base_url: String,
    models: Vec<String>,
    max_tokens: Option<u32>,
    discover_models: bool,
    discovery_limit: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field(
                "api_key",
                &self.api_key.as_deref().map(mask_secret).unwrap_or_else(|| "(none)".to_string()),
            )
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("max_tokens", &self.max_tokens)
            .field("discover_models", &self.discover_models)
            .field("discovery_limit", &self.discovery_limit)
            .finish()
    }
}

impl ProviderConfig {
    /// Config with the provider's default endpoint and model list.
    /// Blank keys are treated as absent.
    pub fn new(kind: ProviderKind, api_key: Option<String>) -> Self {
        Self {
            kind,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: kind.default_base_url().to_string(),
            models: kind.default_models(),
            max_tokens: kind.default_max_tokens(),
            discover_models: kind.default_discovery(),
            discovery_limit: DEFAULT_DISCOVERY_LIMIT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_model_discovery(mut self, enabled: bool) -> Self {
        self.discover_models = enabled;
        self
    }

    /// Cap on how many discovered models `complete` may append
    pub fn with_discovery_limit(mut self, limit: usize) -> Self {
        self.discovery_limit = limit;
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn discover_models(&self) -> bool {
        self.discover_models
    }

    pub fn discovery_limit(&self) -> usize {
        self.discovery_limit
    }
}

/// Outcome of a single availability check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub provider: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn ok(provider: ProviderKind) -> Self {
        Self {
            provider,
            model: None,
            success: true,
            error: None,
        }
    }

    pub fn failed(provider: ProviderKind, error: &ProbeError) -> Self {
        Self {
            provider,
            model: None,
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// One rejected model attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptError {
    pub model: String,
    pub error: String,
}

/// Outcome of walking a provider's candidate models for one prompt.
///
/// `text` and `model_used` are either both set or both absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub provider: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub errors: Vec<AttemptError>,
}

impl CompletionResult {
    pub(crate) fn succeeded(
        provider: ProviderKind,
        model: String,
        text: String,
        errors: Vec<AttemptError>,
    ) -> Self {
        Self {
            provider,
            model_used: Some(model),
            text: Some(text),
            errors,
        }
    }

    pub(crate) fn exhausted(provider: ProviderKind, errors: Vec<AttemptError>) -> Self {
        Self {
            provider,
            model_used: None,
            text: None,
            errors,
        }
    }

    /// Result for a call that was refused before any model was tried
    pub(crate) fn short_circuit(provider: ProviderKind, error: &ProbeError) -> Self {
        Self::exhausted(
            provider,
            vec![AttemptError {
                model: NO_MODEL.to_string(),
                error: error.to_string(),
            }],
        )
    }

    pub fn is_success(&self) -> bool {
        self.text.is_some()
    }
}

/// Mask a secret for Debug output and logs.
/// Shows the first 3 and last 4 chars of keys longer than 7 chars, else "***".
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_display() {
        assert_eq!(ProviderKind::Gemini.to_string(), "gemini");
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
        assert_eq!(ProviderKind::Claude.to_string(), "claude");
    }

    #[test]
    fn test_provider_kind_parse_aliases() {
        assert_eq!("anthropic".parse::<ProviderKind>(), Ok(ProviderKind::Claude));
        assert_eq!("Google".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert_eq!(" OPENAI ".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert!("mistral".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_blank_key_is_absent() {
        let cfg = ProviderConfig::new(ProviderKind::OpenAi, Some("   ".to_string()));
        assert_eq!(cfg.api_key(), None);
        let cfg = ProviderConfig::new(ProviderKind::OpenAi, Some("sk-real".to_string()));
        assert_eq!(cfg.api_key(), Some("sk-real"));
    }

    #[test]
    fn test_defaults_per_kind() {
        let claude = ProviderConfig::new(ProviderKind::Claude, None);
        assert_eq!(claude.base_url(), "https://api.anthropic.com");
        assert_eq!(claude.max_tokens(), Some(1024));
        assert!(!claude.discover_models());

        let gemini = ProviderConfig::new(ProviderKind::Gemini, None);
        assert!(gemini.discover_models());
        assert_eq!(gemini.max_tokens(), None);
        assert_eq!(gemini.models()[0], "gemini-1.5-flash");
        assert_eq!(gemini.discovery_limit(), DEFAULT_DISCOVERY_LIMIT);
    }

    #[test]
    fn test_builders_replace_fields() {
        let cfg = ProviderConfig::new(ProviderKind::OpenAi, Some("k".to_string()))
            .with_base_url("http://localhost:8080/")
            .with_models(["a", "b"])
            .with_max_tokens(Some(8))
            .with_model_discovery(true)
            .with_discovery_limit(0);
        assert_eq!(cfg.base_url(), "http://localhost:8080");
        assert_eq!(cfg.models(), ["a".to_string(), "b".to_string()]);
        assert_eq!(cfg.max_tokens(), Some(8));
        assert!(cfg.discover_models());
        assert_eq!(cfg.discovery_limit(), 0);
    }

    #[test]
    fn test_config_debug_hides_key() {
        let cfg = ProviderConfig::new(ProviderKind::Claude, Some("sk-ant-supersecret".to_string()));
        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("sk-ant-supersecret"));
        assert!(debug.contains("sk-...cret"));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("abcdefghij"), "abc...ghij");
    }

    #[test]
    fn test_probe_result_json_shape() {
        let ok = serde_json::to_value(ProbeResult::ok(ProviderKind::Gemini)).unwrap();
        assert_eq!(ok, serde_json::json!({"provider": "gemini", "success": true}));

        let failed = ProbeResult::failed(ProviderKind::OpenAi, &ProbeError::MissingCredential);
        let json = serde_json::to_value(failed).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No API key");
    }

    #[test]
    fn test_completion_result_json_uses_camel_case() {
        let result = CompletionResult::succeeded(
            ProviderKind::Claude,
            "claude-x".to_string(),
            "hi".to_string(),
            vec![],
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["modelUsed"], "claude-x");
        assert_eq!(json["text"], "hi");
        assert!(result.is_success());
    }

    #[test]
    fn test_short_circuit_has_synthetic_entry() {
        let result =
            CompletionResult::short_circuit(ProviderKind::Gemini, &ProbeError::MissingCredential);
        assert!(!result.is_success());
        assert_eq!(result.model_used, None);
        assert_eq!(
            result.errors,
            vec![AttemptError {
                model: NO_MODEL.to_string(),
                error: "No API key".to_string(),
            }]
        );
    }
}
