//! rollcall — a Discord attendance bot.
//!
//! Tracks per-user online/offline sessions in a single designated guild
//! channel, persists cumulative time and session history to a JSON file,
//! and answers both free-text and slash commands.

pub mod attendance;
pub mod channels;
pub mod cli;
pub mod config;
pub mod logging;
pub mod server;
