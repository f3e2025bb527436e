use clap::Parser;
use tracing::{error, info};

use rollcall::attendance::{Clock, FileStore};
use rollcall::channels::commands;
use rollcall::channels::discord::DiscordApi;
use rollcall::channels::discord_gateway::{self, GATEWAY_INTENTS};
use rollcall::channels::AttendanceBot;
use rollcall::cli::{self, Cli, Command, ConfigCommand};
use rollcall::{config, logging, server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        // No subcommand or explicit `start` both run the bot.
        None | Some(Command::Start) => run_bot().await,

        Some(Command::Config(sub)) => {
            match sub {
                ConfigCommand::Show => cli::handle_config_show()?,
                ConfigCommand::Path => cli::handle_config_path(),
            }
            Ok(())
        }

        Some(Command::Version) => {
            cli::handle_version();
            Ok(())
        }
    }
}

async fn run_bot() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    let cfg = config::load_config()?;
    let discord = cfg.discord.resolve()?;

    let state_dir = config::resolve_state_dir();
    std::fs::create_dir_all(&state_dir)?;

    // A malformed attendance file aborts startup here rather than running
    // on top of a clobbered empty store.
    let store_path = cfg.storage.attendance_path(&state_dir);
    let store = FileStore::open(&store_path)?;
    info!(
        "Attendance store loaded from {} ({} users)",
        store_path.display(),
        store.user_count()
    );

    let api = DiscordApi::new(discord.api_base_url.clone(), discord.token.clone());
    match api
        .register_commands(&discord.client_id, &commands::command_definitions())
        .await
    {
        Ok(()) => info!("Slash commands registered"),
        Err(err) => error!("Slash command registration failed: {}", err),
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let port = cfg.http.resolved_port();
    let http_state_dir = state_dir.clone();
    let http_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(err) = server::serve(port, http_state_dir, http_shutdown).await {
            error!("Liveness server failed: {}", err);
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut bot = AttendanceBot::new(
        Clock::new(store),
        api,
        discord.guild_id,
        discord.channel_id,
    );
    discord_gateway::discord_gateway_loop(
        discord.gateway_url,
        discord.token,
        GATEWAY_INTENTS,
        &mut bot,
        shutdown_rx,
    )
    .await;

    info!("Bot shut down");
    Ok(())
}

/// Initialize logging based on the ROLLCALL_DEV environment variable.
fn init_logging_from_env() -> Result<(), Box<dyn std::error::Error>> {
    let log_config = if std::env::var("ROLLCALL_DEV")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
    {
        logging::LogConfig::development()
    } else {
        logging::LogConfig::production()
    };
    logging::init_logging(log_config)?;
    Ok(())
}
