//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `start` (default) -- run the bot
//! - `config show|path` -- read configuration
//! - `version` -- print version info

use clap::{Parser, Subcommand};

/// Rollcall attendance bot.
#[derive(Parser, Debug)]
#[command(
    name = "rollcall",
    version = env!("CARGO_PKG_VERSION"),
    about = "rollcall — Discord attendance bot"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bot (default when no subcommand is given).
    Start,

    /// Read configuration values.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the resolved configuration as JSON.
    Show,
    /// Print the config file path.
    Path,
}

pub fn handle_config_show() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = crate::config::load_config()?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}

pub fn handle_config_path() {
    println!("{}", crate::config::get_config_path().display());
}

pub fn handle_version() {
    println!("rollcall {}", env!("CARGO_PKG_VERSION"));
}
