//! Provider prober: key validation and first-success model fallback

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ProbeError;
use crate::providers::{ProviderApi, api_for};
use crate::transport::{DEFAULT_TIMEOUT, HttpTransport, ReqwestTransport};
use crate::types::{AttemptError, CompletionResult, ProbeResult, ProviderConfig};

/// Validates keys and obtains completions for any configured provider.
///
/// Holds no per-provider state; the same prober can serve every provider
/// concurrently.
#[derive(Clone)]
pub struct Prober {
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for Prober {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prober")
            .field("transport", &"<dyn HttpTransport>")
            .finish()
    }
}

impl Prober {
    /// Prober backed by reqwest with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(ReqwestTransport::new(timeout)?)))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// One listing call to validate the key. Never fails; errors are data.
    pub async fn check_availability(&self, config: &ProviderConfig) -> ProbeResult {
        let kind = config.kind();
        match self.list_models(config).await {
            Ok(_) => {
                debug!("{} key accepted", kind);
                ProbeResult::ok(kind)
            }
            Err(e) => {
                debug!("{} availability check failed: {}", kind, e);
                ProbeResult::failed(kind, &e)
            }
        }
    }

    /// Models the key can see, as reported by the provider's listing endpoint
    pub async fn discover_models(&self, config: &ProviderConfig) -> Result<Vec<String>, ProbeError> {
        let body = self.list_models(config).await?;
        let api = api_for(config.kind());
        let parsed: Value =
            serde_json::from_str(&body).map_err(|_| ProbeError::Unparsable(body.clone()))?;
        Ok(api.extract_models(&parsed))
    }

    /// Ask `prompt` of each candidate model in order until one answers.
    /// Never fails; every rejected attempt is recorded in `errors`.
    pub async fn complete(&self, config: &ProviderConfig, prompt: &str) -> CompletionResult {
        let kind = config.kind();
        let Some(api_key) = config.api_key() else {
            return CompletionResult::short_circuit(kind, &ProbeError::MissingCredential);
        };

        let candidates = self.candidate_models(config).await;
        if candidates.is_empty() {
            return CompletionResult::short_circuit(kind, &ProbeError::NoCandidates);
        }

        let api = api_for(kind);
        let mut errors = Vec::new();

        for (idx, model) in candidates.iter().enumerate() {
            debug!(
                "Trying {} model {} ({}/{})",
                kind,
                model,
                idx + 1,
                candidates.len()
            );

            match self.attempt(api, config, api_key, model, prompt).await {
                Ok(text) => {
                    if idx > 0 {
                        info!(
                            "{} answered with fallback model {} after {} rejected",
                            kind,
                            model,
                            errors.len()
                        );
                    }
                    return CompletionResult::succeeded(kind, model.clone(), text, errors);
                }
                Err(e) => {
                    debug!("{} model {} rejected: {}", kind, model, e);
                    errors.push(AttemptError {
                        model: model.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        warn!("{}: all {} candidate models failed", kind, candidates.len());
        CompletionResult::exhausted(kind, errors)
    }

    /// Availability checks for every provider at once, in input order
    pub async fn check_all(&self, configs: &[ProviderConfig]) -> Vec<ProbeResult> {
        join_all(configs.iter().map(|c| self.check_availability(c))).await
    }

    /// Completions for every provider at once, in input order
    pub async fn complete_all(
        &self,
        configs: &[ProviderConfig],
        prompt: &str,
    ) -> Vec<CompletionResult> {
        join_all(configs.iter().map(|c| self.complete(c, prompt))).await
    }

    /// GET the listing endpoint; returns the raw body on success
    async fn list_models(&self, config: &ProviderConfig) -> Result<String, ProbeError> {
        let api_key = config.api_key().ok_or(ProbeError::MissingCredential)?;
        let api = api_for(config.kind());
        let request = api
            .availability_request(config, api_key)
            .map_err(|e| ProbeError::transport(&e))?;

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ProbeError::transport(&e))?;

        // Listing payloads are not inspected beyond the status
        if !response.is_success() {
            return Err(ProbeError::Rejected {
                status: response.status,
                body: String::new(),
            });
        }
        Ok(response.body)
    }

    /// Configured models, followed by up to `discovery_limit` newly
    /// discovered ones when enabled
    async fn candidate_models(&self, config: &ProviderConfig) -> Vec<String> {
        let mut candidates = config.models().to_vec();
        if !config.discover_models() {
            return candidates;
        }

        match self.discover_models(config).await {
            Ok(discovered) => {
                let before = candidates.len();
                let limit = config.discovery_limit();
                for model in discovered {
                    if candidates.len() - before >= limit {
                        break;
                    }
                    if !candidates.iter().any(|c| same_model(c, &model)) {
                        candidates.push(model);
                    }
                }
                debug!(
                    "{} discovery added {} candidate models (limit {})",
                    config.kind(),
                    candidates.len() - before,
                    limit
                );
            }
            Err(e) => {
                warn!(
                    "{} model discovery failed, using configured list: {}",
                    config.kind(),
                    e
                );
            }
        }
        candidates
    }

    /// One shot at one model
    async fn attempt(
        &self,
        api: &dyn ProviderApi,
        config: &ProviderConfig,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> Result<String, ProbeError> {
        let request = api
            .completion_request(config, api_key, model, prompt)
            .map_err(|e| ProbeError::transport(&e))?;

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ProbeError::transport(&e))?;

        if !response.is_success() {
            return Err(ProbeError::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|body| api.extract_text(&body))
            .filter(|text| !text.trim().is_empty())
            .ok_or(ProbeError::Unparsable(response.body))
    }
}

/// Model ids compare equal with or without Gemini's `models/` prefix
fn same_model(a: &str, b: &str) -> bool {
    let strip = crate::providers::gemini::strip_model_prefix;
    strip(a) == strip(b)
}
