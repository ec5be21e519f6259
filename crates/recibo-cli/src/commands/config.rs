//! Config command - manage configuration.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use recibo_core::models::config::ReciboConfig;

use super::process::default_config_path;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "pipeline.confidence_threshold")
        key: String,
        /// New value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(),
        ConfigCommand::Init(init_args) => init_config(init_args),
        ConfigCommand::Set { key, value } => set_config(&key, &value),
        ConfigCommand::Path => show_path(),
    }
}

fn show_config() -> anyhow::Result<()> {
    let config_path = default_config_path();

    let config = if config_path.exists() {
        ReciboConfig::from_file(&config_path)?
    } else {
        println!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
        ReciboConfig::default()
    };

    // Keys are secrets; show only how many are configured.
    let mut display = config.clone();
    let key_count = display.ai.api_keys.len();
    display.ai.api_keys = vec![format!("<{key_count} key(s) configured>")];

    println!("{}", serde_json::to_string_pretty(&display)?);
    Ok(())
}

fn init_config(args: InitArgs) -> anyhow::Result<()> {
    let path = args.output.unwrap_or_else(default_config_path);

    if path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    ReciboConfig::default().save(&path)?;
    println!("{} Wrote default config to {}", style("✓").green(), path.display());
    Ok(())
}

fn set_config(key: &str, value: &str) -> anyhow::Result<()> {
    let path = default_config_path();
    let mut config = if path.exists() {
        ReciboConfig::from_file(&path)?
    } else {
        ReciboConfig::default()
    };

    match key {
        "pipeline.confidence_threshold" => {
            config.pipeline.confidence_threshold = value.parse()?;
        }
        "pipeline.max_attempts" => config.pipeline.max_attempts = value.parse()?,
        "pipeline.base_backoff_ms" => config.pipeline.base_backoff_ms = value.parse()?,
        "ai.timeout_secs" => config.ai.timeout_secs = value.parse()?,
        "ai.max_rotation_attempts" => config.ai.max_rotation_attempts = value.parse()?,
        "ai.base_url" => config.ai.base_url = value.to_string(),
        "ai.api_keys" => {
            config.ai.api_keys = value.split(',').map(|s| s.trim().to_string()).collect();
        }
        "ai.models" => {
            config.ai.models = value.split(',').map(|s| s.trim().to_string()).collect();
        }
        _ => anyhow::bail!("Unknown configuration key: {}", key),
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    config.save(&path)?;
    println!("{} Set {} = {}", style("✓").green(), key, value);
    Ok(())
}

fn show_path() -> anyhow::Result<()> {
    println!("{}", default_config_path().display());
    Ok(())
}
