use anyhow::{Context, Result};
use keyprobe_core::{ProviderConfig, ProviderKind, mask_secret};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyprobeConfig {
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_probe_max_tokens")]
    pub probe_max_tokens: u32,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_probe_max_tokens() -> u32 {
    16
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            probe_max_tokens: default_probe_max_tokens(),
        }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: ProviderSection,
    #[serde(default)]
    pub openai: ProviderSection,
    #[serde(default)]
    pub claude: ProviderSection,
}

impl ProvidersConfig {
    pub fn section(&self, kind: ProviderKind) -> &ProviderSection {
        match kind {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Claude => &self.claude,
        }
    }

    fn sections_mut(&mut self) -> [&mut ProviderSection; 3] {
        [&mut self.gemini, &mut self.openai, &mut self.claude]
    }
}

/// One `[providers.<name>]` table. Unset fields take the provider's defaults.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discover_models: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_limit: Option<usize>,
}

impl std::fmt::Debug for ProviderSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSection")
            .field("enabled", &self.enabled)
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("max_tokens", &self.max_tokens)
            .field("discover_models", &self.discover_models)
            .field("discovery_limit", &self.discovery_limit)
            .finish()
    }
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            base_url: None,
            models: None,
            max_tokens: None,
            discover_models: None,
            discovery_limit: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Environment variables consulted, in order, when a section has no key
fn key_env_vars(kind: ProviderKind) -> &'static [&'static str] {
    match kind {
        ProviderKind::Gemini => &["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"],
        ProviderKind::OpenAi => &["OPENAI_API_KEY"],
        ProviderKind::Claude => &["CLAUDE_API_KEY", "ANTHROPIC_API_KEY"],
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".keyprobe")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl KeyprobeConfig {
    /// Load from `custom_path`, or the default location if it exists.
    /// Without a file, every provider runs on defaults plus the environment.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = match custom_path {
            Some(path) => path.clone(),
            None => {
                let path = default_config_path();
                if !path.exists() {
                    debug!("No config at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::load_file(&path)
    }

    fn load_file(path: &Path) -> Result<Self> {
        // Refuse config files other users can read
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `keyprobe init` first.",
                path.display()
            )
        })?;

        warn_on_hardcoded_keys(&content);
        Self::parse(&content, |name| std::env::var(name).ok())
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Parse TOML after expanding allowlisted `${VAR}` references
    pub fn parse(content: &str, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let expanded = expand_env_vars(content, &env);
        Ok(toml::from_str(&expanded)?)
    }

    /// One [`ProviderConfig`] per enabled provider, keys filled from `env`
    /// where the file leaves them empty.
    pub fn provider_configs(&self, env: impl Fn(&str) -> Option<String>) -> Vec<ProviderConfig> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.providers.section(*kind).enabled)
            .map(|kind| self.provider_config(kind, &env))
            .collect()
    }

    pub fn provider_config(
        &self,
        kind: ProviderKind,
        env: impl Fn(&str) -> Option<String>,
    ) -> ProviderConfig {
        let section = self.providers.section(kind);
        let api_key = Some(section.api_key.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| {
                key_env_vars(kind)
                    .iter()
                    .filter_map(|&name| env(name))
                    .find(|value| !value.trim().is_empty())
            });

        let mut config = ProviderConfig::new(kind, api_key);
        if let Some(base_url) = &section.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(models) = &section.models {
            config = config.with_models(models.iter().cloned());
        }
        if section.max_tokens.is_some() {
            config = config.with_max_tokens(section.max_tokens);
        }
        if let Some(discover) = section.discover_models {
            config = config.with_model_discovery(discover);
        }
        if let Some(limit) = section.discovery_limit {
            config = config.with_discovery_limit(limit);
        }
        config
    }

    /// Copy with every key masked, for display
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        for section in copy.providers.sections_mut() {
            if !section.api_key.is_empty() {
                section.api_key = mask_secret(&section.api_key);
            }
        }
        copy
    }
}

fn warn_on_hardcoded_keys(content: &str) {
    for line in content.lines() {
        let line = line.trim();
        let Some(value) = line.strip_prefix("api_key") else {
            continue;
        };
        let value = value.trim_start().trim_start_matches('=').trim().trim_matches('"');
        if !value.is_empty() && !value.contains("${") {
            warn!(
                "API key is hardcoded in config file. For security, use environment variables: api_key = \"${{OPENAI_API_KEY}}\""
            );
            return;
        }
    }
}

/// Allowlist of environment variable names that may be expanded in config files.
const ALLOWED_ENV_VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "GOOGLE_AI_API_KEY",
    "OPENAI_API_KEY",
    "CLAUDE_API_KEY",
    "ANTHROPIC_API_KEY",
    "HOME",
    "USER",
];

fn expand_env_vars(s: &str, env: &impl Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = &result[abs_start + 2..abs_start + end];

        if !ALLOWED_ENV_VARS.contains(&var_name) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            // Leave the ${VAR} unexpanded so it's obvious
            pos = abs_start + end + 1;
            continue;
        }

        let value = env(var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}
