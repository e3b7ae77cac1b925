mod gateway;
mod pipeline;

use clap::{Parser, Subcommand};
use gateway::Gateway;
use pipeline::Pipeline;
use std::collections::HashMap;
use std::sync::Arc;
use wikipeek_channels::discord::{DiscordChannel, DiscordRest};
use wikipeek_core::config;
use wikipeek_core::traits::{Channel, ChatApi};
use wikipeek_snapshot::SnapshotEngine;

#[derive(Parser)]
#[command(
    name = "wikipeek",
    version,
    about = "Wiki reference lookups for chat, rendered headlessly"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Check configuration and Discord credentials.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guards = init_logging(&cfg.bot.log_dir, &cfg.bot.log_level)?;

    match cli.command {
        Commands::Start => {
            let discord = cfg
                .channel
                .discord
                .clone()
                .ok_or_else(|| anyhow::anyhow!("no [channel.discord] section in config"))?;
            if !discord.enabled {
                anyhow::bail!("Discord channel is disabled. Enable it in config.toml.");
            }
            if discord.bot_token.is_empty() {
                anyhow::bail!(
                    "Discord is enabled but bot_token is empty. Set it in config.toml."
                );
            }

            let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
            channels.insert(
                "discord".to_string(),
                Arc::new(DiscordChannel::new(discord.clone())),
            );

            let chat: Arc<dyn ChatApi> = Arc::new(DiscordRest::new(&discord.bot_token));
            let engine = Arc::new(SnapshotEngine::new(cfg.wiki.clone(), cfg.render.clone()));
            let pipeline = Arc::new(Pipeline::new(chat, engine, &cfg.wiki, &cfg.reply));

            println!("wikipeek — starting...");
            Gateway::new(channels, pipeline).run().await?;
        }
        Commands::Status => {
            println!("wikipeek — status\n");
            println!("Config: {}", cli.config);
            println!("Wiki base URL: {}", cfg.wiki.base_url);

            match cfg.channel.discord {
                Some(ref discord) if discord.enabled => {
                    if discord.bot_token.is_empty() {
                        println!("  discord: enabled, but bot_token is empty");
                    } else {
                        match DiscordRest::new(&discord.bot_token).current_username().await {
                            Ok(name) => println!("  discord: token valid (logged in as {name})"),
                            Err(e) => println!("  discord: token check failed: {e}"),
                        }
                    }
                }
                _ => println!("  discord: disabled"),
            }
        }
    }

    Ok(())
}

/// Stderr logging plus the two append-only file sinks: `requests.log`
/// (events with the request-log target) and `error.log` (all errors).
fn init_logging(
    log_dir: &str,
    level: &str,
) -> anyhow::Result<Vec<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::filter::{LevelFilter, Targets};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    std::fs::create_dir_all(log_dir)?;

    let (request_writer, request_guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::never(log_dir, "requests.log"),
    );
    let request_layer = fmt::layer()
        .with_writer(request_writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(
            Targets::new().with_target(wikipeek_core::REQUEST_LOG_TARGET, LevelFilter::TRACE),
        );

    let (error_writer, error_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, "error.log"));
    let error_layer = fmt::layer()
        .with_writer(error_writer)
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    let stderr_layer = fmt::layer().with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
    );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(request_layer)
        .with(error_layer)
        .init();

    Ok(vec![request_guard, error_guard])
}
