//! CLI entrypoint for streamchat
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod chat;
mod commands;

use anyhow::{Context, Result, bail};
use chat::{ChatSession, format_message_line};
use clap::Parser;
use commands::{Cli, Command, HistoryAction, SettingsAction};
use std::sync::Arc;
use streamchat_application::{
    ChatController, ClearHistoryUseCase, HistoryRepository, LoadHistoryUseCase, SettingsStore,
    StoragePort,
};
use streamchat_domain::ChatParams;
use streamchat_infrastructure::{
    ConfigLoader, FileConfig, InMemoryStorage, JsonFileStorage, StreamingChatClient,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Initialize logging based on verbosity level; stdout carries the reply
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        println!("Configuration sources (in priority order):");
        for line in ConfigLoader::config_sources(cli.config.as_deref()) {
            println!("  {}", line);
        }
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow::anyhow!("{}", e))
            .context("Failed to load configuration")?
    };

    let issues = config.validate();
    for issue in &issues {
        warn!("Config: {}", issue);
    }
    if !issues.is_empty() {
        bail!("Invalid configuration ({} issue(s))", issues.len());
    }

    info!("Starting streamchat");

    // === Dependency Injection ===
    let storage = open_storage(&config, cli.no_history);
    let history = HistoryRepository::new(storage.clone()).with_limit(config.history.limit);
    let settings = SettingsStore::new(storage.clone(), config.chat_params());

    match cli.command.take() {
        Some(Command::History { action }) => run_history(action, history).await,
        Some(Command::Settings { action }) => run_settings(action, &settings).await,
        None => {
            // Request flag > stored settings > file config
            let params = cli.params.to_patch().apply_to(settings.get().await?);
            params
                .validate()
                .context("Invalid request parameters")?;
            run_chat(&cli, &config, history, params).await
        }
    }
}

fn open_storage(config: &FileConfig, ephemeral: bool) -> Arc<dyn StoragePort> {
    if ephemeral {
        return Arc::new(InMemoryStorage::new());
    }
    match config.history.store_path() {
        Some(path) => {
            info!("Using store {}", path.display());
            Arc::new(JsonFileStorage::new(path))
        }
        None => {
            warn!("No data directory found, history will not be saved");
            Arc::new(InMemoryStorage::new())
        }
    }
}

async fn run_chat(
    cli: &Cli,
    config: &FileConfig,
    history: HistoryRepository,
    params: ChatParams,
) -> Result<()> {
    let gateway_config = config.gateway.to_gateway_config()?;
    let gateway = Arc::new(StreamingChatClient::new(gateway_config)?);

    let controller = ChatController::new(gateway, history);
    let mut session = ChatSession::new(controller, params).with_metrics(!cli.quiet);

    match &cli.prompt {
        Some(prompt) => {
            session.ask(prompt).await?;
        }
        None => {
            if !cli.no_history {
                let restored = session.load_history().await;
                if restored > 0 {
                    eprintln!("Restored {} message(s) from history.", restored);
                }
            }
            session.run_interactive().await?;
        }
    }
    Ok(())
}

async fn run_history(action: HistoryAction, history: HistoryRepository) -> Result<()> {
    match action {
        HistoryAction::Show => {
            let messages = LoadHistoryUseCase::new(history).execute().await;
            if messages.is_empty() {
                eprintln!("History is empty.");
            }
            for message in &messages {
                println!("{}", format_message_line(message));
            }
        }
        HistoryAction::Clear => {
            ClearHistoryUseCase::new(history).execute().await?;
            eprintln!("History cleared.");
        }
    }
    Ok(())
}

async fn run_settings(action: SettingsAction, settings: &SettingsStore) -> Result<()> {
    let params = match action {
        SettingsAction::Show => settings.get().await?,
        SettingsAction::Set(args) => {
            let patch = args.to_patch();
            if patch.is_empty() {
                bail!("Nothing to set. Use --model, --temperature or --max-tokens.");
            }
            settings.update(patch).await?
        }
        SettingsAction::Clear => {
            settings.clear().await?;
            settings.get().await?
        }
    };

    println!("model       = {}", params.model);
    println!("temperature = {}", params.temperature);
    println!("max_tokens  = {}", params.max_tokens);
    Ok(())
}
