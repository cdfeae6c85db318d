//! Slash command definitions and Discord registration.

pub mod slash;

use anyhow::Result;
use log::info;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::Command;
use serenity::model::id::GuildId;
use serenity::prelude::Context;

/// All slash commands this bot registers.
pub fn all_commands() -> Vec<CreateApplicationCommand> {
    let mut commands = vec![slash::setup::create_command()];
    commands.extend(slash::server::create_commands());
    commands
}

/// Registers commands for a single guild (development mode, instant updates).
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    let registered = guild_id
        .set_application_commands(&ctx.http, |builder| {
            builder.set_application_commands(all_commands())
        })
        .await?;
    info!(
        "Registered {} slash commands for guild {guild_id}",
        registered.len()
    );
    Ok(())
}

/// Registers commands globally (production mode, may take up to an hour).
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    let registered = Command::set_global_application_commands(&ctx.http, |builder| {
        builder.set_application_commands(all_commands())
    })
    .await?;
    info!("Registered {} slash commands globally", registered.len());
    Ok(())
}
