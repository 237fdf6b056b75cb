//! Failure taxonomy for probes and completions
//!
//! None of these escape the prober as `Err`: they are rendered to strings and
//! reported inside [`ProbeResult`](crate::types::ProbeResult) or
//! [`CompletionResult`](crate::types::CompletionResult).

use thiserror::Error;

/// Why a single provider call did not produce a usable answer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// No key configured; no network I/O was attempted
    #[error("No API key")]
    MissingCredential,

    /// DNS, connect, timeout or body-read failure
    #[error("{0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("{}", format_rejected(*status, body))]
    Rejected { status: u16, body: String },

    /// Success status, but the expected field was missing or empty
    #[error("{0}")]
    Unparsable(String),

    /// Nothing to try; no network I/O was attempted
    #[error("No candidate models configured")]
    NoCandidates,
}

fn format_rejected(status: u16, body: &str) -> String {
    if body.trim().is_empty() {
        format!("Status {}", status)
    } else {
        format!("Status {}: {}", status, body)
    }
}

impl ProbeError {
    /// Build a transport error from any error chain, keeping the causes
    pub fn transport(err: &anyhow::Error) -> Self {
        Self::Transport(format!("{:#}", err))
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_message() {
        assert_eq!(ProbeError::MissingCredential.to_string(), "No API key");
    }

    #[test]
    fn test_rejected_without_body() {
        let err = ProbeError::Rejected {
            status: 401,
            body: "  ".to_string(),
        };
        assert_eq!(err.to_string(), "Status 401");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_rejected_with_body() {
        let err = ProbeError::Rejected {
            status: 403,
            body: r#"{"error":"forbidden"}"#.to_string(),
        };
        assert_eq!(err.to_string(), r#"Status 403: {"error":"forbidden"}"#);
    }

    #[test]
    fn test_transport_keeps_cause_chain() {
        let inner = anyhow::anyhow!("connection refused").context("error sending request");
        let err = ProbeError::transport(&inner);
        let msg = err.to_string();
        assert!(msg.contains("error sending request"));
        assert!(msg.contains("connection refused"));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_unparsable_is_raw_body() {
        let err = ProbeError::Unparsable(r#"{"choices":[]}"#.to_string());
        assert_eq!(err.to_string(), r#"{"choices":[]}"#);
    }
}
