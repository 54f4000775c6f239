use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gemini_chat::{Config, GeminiClient, app, logging};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "gemini-chat")]
#[command(version, about = "Chat with Google Gemini in the terminal", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.gemini-chat/config.toml)
    #[arg(short, long, env = "GEMINI_CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured model
    #[arg(short, long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Commands {
    /// Open the chat screen (the default)
    Chat,
    /// Print the effective configuration
    Config,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(model) = &cli.model {
        config.model = model.clone();
        config.validate()?;
    }
    Ok(config)
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::default_path(&Config::home_dir()?)),
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }
    Config::default().save(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn print_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{}", rendered);
    let key_state = if config.api_key().is_some() { "set" } else { "not set" };
    println!("# {} is {}", config.api_key_env, key_state);
    println!("# log file: {}", config.log_path().display());
    Ok(())
}

async fn chat(config: Config) -> Result<()> {
    logging::init(&config.log_path())?;

    let api_key = config.api_key();
    if api_key.is_none() {
        warn!(env = %config.api_key_env, "No API key found, sessions will fail to start");
    }
    let client = GeminiClient::new(&config, api_key)?;
    info!(model = %client.model(), "Starting gemini-chat");

    app::run(&config, Arc::new(client)).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.clone().unwrap_or(Commands::Chat) {
        Commands::Chat => chat(load_config(&cli)?).await,
        Commands::Config => print_config(&load_config(&cli)?),
        Commands::Init { force } => init_config(&config_path(&cli)?, force),
    }
}
