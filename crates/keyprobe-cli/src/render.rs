//! Human-readable and JSON output for probe results

use keyprobe_core::{CompletionResult, ProbeResult, ProviderKind};
use serde::Serialize;
use serde_json::{Map, Value};

/// Result of `test --deep` for one provider
#[derive(Debug, Clone, Serialize)]
pub struct DeepProbe {
    pub check: ProbeResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionResult>,
}

/// JSON object keyed by provider name
pub fn by_provider<T: Serialize>(items: &[(ProviderKind, T)]) -> Value {
    let mut map = Map::new();
    for (kind, item) in items {
        map.insert(
            kind.to_string(),
            serde_json::to_value(item).unwrap_or(Value::Null),
        );
    }
    Value::Object(map)
}

pub fn probe_line(result: &ProbeResult) -> String {
    match (result.success, &result.error) {
        (true, _) => format!("{:<8} ok", result.provider),
        (false, Some(error)) => format!("{:<8} FAILED  {}", result.provider, error),
        (false, None) => format!("{:<8} FAILED", result.provider),
    }
}

pub fn deep_lines(probe: &DeepProbe) -> Vec<String> {
    let mut lines = vec![probe_line(&probe.check)];
    if let Some(completion) = &probe.completion {
        match &completion.model_used {
            Some(model) => lines.push(format!("         usable model: {}", model)),
            None => {
                lines.push("         no candidate model answered".to_string());
                lines.extend(attempt_lines(completion));
            }
        }
    }
    lines
}

pub fn completion_block(result: &CompletionResult) -> String {
    let mut out = String::new();
    match (&result.model_used, &result.text) {
        (Some(model), Some(text)) => {
            out.push_str(&format!("== {} ({})\n", result.provider, model));
            out.push_str(text.trim_end());
            out.push('\n');
            if !result.errors.is_empty() {
                out.push_str(&format!(
                    "   ({} model(s) rejected before this one)\n",
                    result.errors.len()
                ));
            }
        }
        _ => {
            out.push_str(&format!("== {}: no model answered\n", result.provider));
            for line in attempt_lines(result) {
                out.push_str(&line);
                out.push('\n');
            }
        }
    }
    out
}

fn attempt_lines(result: &CompletionResult) -> Vec<String> {
    result
        .errors
        .iter()
        .map(|e| format!("   - {}: {}", e.model, e.error))
        .collect()
}
