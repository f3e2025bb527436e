//! Discord channel integration.
//!
//! REST client, gateway inbound loop, the command surface, and the routing
//! of inbound events onto clock transitions.

pub mod commands;
pub mod discord;
pub mod discord_gateway;
pub mod inbound;

pub use inbound::AttendanceBot;

/// Where an inbound event may be acted on. Commands are accepted only from
/// one designated guild and one designated channel within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Designated guild and designated channel.
    Allowed,
    /// Designated guild, different channel.
    WrongChannel,
    /// Different guild, or no guild at all (DM).
    OutOfScope,
}

/// Classify an event against the configured guild + channel restriction.
pub fn classify_scope(
    target_guild: &str,
    target_channel: &str,
    guild_id: Option<&str>,
    channel_id: &str,
) -> Scope {
    match guild_id {
        Some(guild) if guild == target_guild => {
            if channel_id == target_channel {
                Scope::Allowed
            } else {
                Scope::WrongChannel
            }
        }
        _ => Scope::OutOfScope,
    }
}
