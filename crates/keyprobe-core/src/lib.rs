//! keyprobe-core - API key validation for hosted LLM providers
//!
//! This crate provides:
//! - Per-provider configuration built once at startup ([`ProviderConfig`])
//! - Wire adapters for Gemini, OpenAI and Anthropic behind [`ProviderApi`]
//! - A [`Prober`] that checks keys and walks a model list until one answers
//! - An [`HttpTransport`] seam so the network can be replaced in tests

pub mod error;
pub mod prober;
pub mod providers;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use error::ProbeError;
pub use prober::Prober;
pub use providers::{ProviderApi, api_for};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{
    AttemptError, CompletionResult, DEFAULT_DISCOVERY_LIMIT, NO_MODEL, ProbeResult, ProviderConfig, ProviderKind,
    mask_secret,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Just verify that all main types are exported
        let _ = std::mem::size_of::<Prober>();
        let _ = std::mem::size_of::<ProviderConfig>();
        let _ = std::mem::size_of::<ProbeResult>();
        let _ = std::mem::size_of::<CompletionResult>();
        let _ = std::mem::size_of::<ProbeError>();
    }
}
