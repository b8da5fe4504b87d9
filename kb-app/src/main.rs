//! KlassBot main binary.

mod commands;
mod config;
mod shell;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kb_catalog::CatalogClient;
use kb_core::{CatalogApi, InteractionRouter, PreferenceStore, SubjectService};
use kb_discord::{DiscordGateway, DiscordRest};
use shell::BotShell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

const INBOUND_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Parser)]
#[command(name = "klassbot", version, about = "KlassBot subject resource bot")]
struct Cli {
    /// Path to the config file.
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the bot (default).
    Serve,
    /// Overwrite the application's slash commands and exit.
    RegisterCommands,
    /// Validate config and check that the catalog is reachable.
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing()?;
    install_panic_hook();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve);

    match command {
        Command::Serve => serve(&cli.config).await,
        Command::RegisterCommands => register_commands(&cli.config).await,
        Command::Doctor => doctor(&cli.config).await,
    }
}

async fn serve(config_path: &Path) -> Result<()> {
    let cfg = config::load(config_path)?;
    config::validate(&cfg)?;

    let store = PreferenceStore::new(&cfg.general.database_path);
    store.init_schema().await?;

    let catalog = CatalogClient::new(&cfg.general.catalog_base_url)?;
    let service = SubjectService::new(Arc::new(catalog), store, InteractionRouter::new());
    let rest = DiscordRest::new(&cfg.discord.bot_token, &cfg.discord.application_id)?;

    let (tx, rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
    DiscordGateway::new(&cfg.discord.bot_token).start(tx);

    tracing::info!(
        catalog_base_url = %cfg.general.catalog_base_url,
        database_path = %cfg.general.database_path,
        "klassbot serving"
    );
    BotShell::new(service, rest, rx).run().await
}

async fn register_commands(config_path: &Path) -> Result<()> {
    let cfg = config::load(config_path)?;
    config::validate(&cfg)?;

    let rest = DiscordRest::new(&cfg.discord.bot_token, &cfg.discord.application_id)?;
    rest.register_commands(cfg.discord.guild_id.as_deref(), &commands::command_definitions())
        .await?;
    match cfg.discord.guild_id.as_deref() {
        Some(guild_id) => println!("registered slash commands for guild {guild_id}"),
        None => println!("registered global slash commands (may take up to an hour to appear)"),
    }
    Ok(())
}

async fn doctor(config_path: &Path) -> Result<()> {
    let cfg = config::load(config_path)?;
    println!("config: ok ({})", config_path.display());

    match config::validate(&cfg) {
        Ok(()) => println!("discord credentials: present"),
        Err(e) => println!("discord credentials: {e}"),
    }

    let store = PreferenceStore::new(&cfg.general.database_path);
    match store.init_schema().await {
        Ok(()) => println!("preference store: ok ({})", cfg.general.database_path),
        Err(e) => println!("preference store: {e}"),
    }

    let catalog = CatalogClient::new(&cfg.general.catalog_base_url)?;
    match catalog.list_subjects().await {
        Ok(subjects) => println!(
            "catalog: ok ({} subjects at {})",
            subjects.len(),
            cfg.general.catalog_base_url
        ),
        Err(e) => println!("catalog: {e}"),
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new("info,klassbot=debug,kb_core=debug,kb_catalog=debug,kb_discord=debug"),
    };
    let log_format = std::env::var("KLASSBOT_LOG_FORMAT")
        .unwrap_or_else(|_| "compact".to_string())
        .to_ascii_lowercase();

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .compact()
                .init();
        }
        other => {
            return Err(anyhow::anyhow!(
                "unsupported KLASSBOT_LOG_FORMAT={other:?}; expected one of: json, compact"
            ));
        }
    }

    tracing::info!(
        log_format = %log_format,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_to_string(panic_info.payload());
        tracing::error!(
            panic_location = %location,
            panic_payload = %payload,
            "panic captured"
        );
        default_hook(panic_info);
    }));
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return msg.to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
