use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keyprobe_core::{Prober, ProviderConfig, ProviderKind};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::KeyprobeConfig;
use render::DeepProbe;

/// Prompt sent by `test --deep`; only whether a model answers matters
const DEEP_PROBE_PROMPT: &str = "ping";

#[derive(Parser)]
#[command(name = "keyprobe")]
#[command(version)]
#[command(about = "Check Gemini, OpenAI and Claude API keys")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every configured key against its provider
    Test {
        /// Also run a tiny completion to find a usable model
        #[arg(long)]
        deep: bool,

        /// Print JSON keyed by provider
        #[arg(long)]
        json: bool,
    },

    /// Ask every configured provider the same question
    Ask {
        /// The question to send
        question: String,

        /// Print JSON keyed by provider
        #[arg(long)]
        json: bool,
    },

    /// List the models a provider reports for the configured key
    Models {
        /// gemini, openai or claude
        provider: ProviderKind,
    },

    /// Write a default config file
    Init,

    /// Show the resolved configuration with keys masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays parseable
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Test { deep, json } => cmd_test(&cli.config, deep, json).await,
        Commands::Ask { question, json } => cmd_ask(&cli.config, &question, json).await,
        Commands::Models { provider } => cmd_models(&cli.config, provider).await,
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
    }
}

/// Load config and build the per-provider configs once
fn load(config_path: &Option<PathBuf>) -> Result<(KeyprobeConfig, Vec<ProviderConfig>, Prober)> {
    let cfg = KeyprobeConfig::load(config_path)?;
    let providers = cfg.provider_configs(|name| std::env::var(name).ok());
    if providers.is_empty() {
        warn!("All providers are disabled in the config");
    }
    let prober = Prober::with_timeout(cfg.probe.timeout())?;
    Ok((cfg, providers, prober))
}

async fn cmd_test(config_path: &Option<PathBuf>, deep: bool, json: bool) -> Result<()> {
    let (cfg, providers, prober) = load(config_path)?;
    let checks = prober.check_all(&providers).await;

    if !deep {
        if json {
            let keyed: Vec<_> = checks.iter().map(|c| (c.provider, c)).collect();
            println!("{}", serde_json::to_string_pretty(&render::by_provider(&keyed))?);
        } else {
            for check in &checks {
                println!("{}", render::probe_line(check));
            }
        }
        return Ok(());
    }

    // Only keys that passed the listing check are worth an inference call
    let probe_configs: Vec<ProviderConfig> = providers
        .iter()
        .zip(&checks)
        .filter(|(_, check)| check.success)
        .map(|(p, _)| p.clone().with_max_tokens(Some(cfg.probe.probe_max_tokens)))
        .collect();
    let mut completions = prober
        .complete_all(&probe_configs, DEEP_PROBE_PROMPT)
        .await
        .into_iter();

    let deep_results: Vec<DeepProbe> = checks
        .into_iter()
        .map(|check| {
            let completion = if check.success { completions.next() } else { None };
            DeepProbe { check, completion }
        })
        .collect();

    if json {
        let keyed: Vec<_> = deep_results.iter().map(|d| (d.check.provider, d)).collect();
        println!("{}", serde_json::to_string_pretty(&render::by_provider(&keyed))?);
    } else {
        for result in &deep_results {
            for line in render::deep_lines(result) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

async fn cmd_ask(config_path: &Option<PathBuf>, question: &str, json: bool) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("Question must not be empty");
    }

    let (_, providers, prober) = load(config_path)?;
    info!("Asking {} provider(s)", providers.len());
    let results = prober.complete_all(&providers, question).await;

    if json {
        let keyed: Vec<_> = results.iter().map(|r| (r.provider, r)).collect();
        println!("{}", serde_json::to_string_pretty(&render::by_provider(&keyed))?);
    } else {
        for result in &results {
            println!("{}", render::completion_block(result));
        }
    }
    Ok(())
}

async fn cmd_models(config_path: &Option<PathBuf>, provider: ProviderKind) -> Result<()> {
    let (cfg, _, prober) = load(config_path)?;
    // Build even if disabled: listing is an explicit request
    let config = cfg.provider_config(provider, |name| std::env::var(name).ok());
    let models = prober
        .discover_models(&config)
        .await
        .with_context(|| format!("Failed to list {} models", provider))?;

    for model in &models {
        println!("{}", model);
    }
    info!("{} reports {} model(s)", provider, models.len());
    Ok(())
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config::default_config_path();
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    let default_config = include_str!("../../../config/default.toml");
    tokio::fs::write(&config_path, default_config).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    info!("Created default config at {}", config_path.display());

    println!("keyprobe initialized at {}", config_dir.display());
    println!("Export GEMINI_API_KEY, OPENAI_API_KEY and CLAUDE_API_KEY (or ANTHROPIC_API_KEY), then run `keyprobe test`.");
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = KeyprobeConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.masked())?);

    for provider in cfg.provider_configs(|name| std::env::var(name).ok()) {
        println!("# {:?}", provider);
    }
    Ok(())
}
