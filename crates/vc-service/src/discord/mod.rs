//! Chat platform integration (serenity).

pub mod embeds;
pub mod handler;
pub mod platform;

pub use handler::Handler;
pub use platform::DiscordPlatform;

use serenity::all::GatewayIntents;

/// Gateway intents the service needs: voice states, the team command and
/// panel reactions.
#[must_use]
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::MESSAGE_CONTENT
}
