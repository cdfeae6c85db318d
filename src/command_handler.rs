//! Per-interaction dispatch: acknowledge, execute, reply.
//!
//! Every inbound slash command runs as one async task that defers the
//! interaction (the remote API call can take seconds), performs the setup or
//! relay operation, and edits exactly one reply back. Expected failures
//! ([`RelayError`]) are rendered as embeds here; anything else bubbles up to
//! the event handler in `bin/bot.rs`.

use anyhow::{anyhow, Result};
use log::{info, warn};
use serenity::builder::CreateEmbed;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::id::ChannelId;
use serenity::prelude::Context;
use serenity::utils::Colour;

use crate::database::Database;
use crate::error::RelayError;
use crate::oxford::{OxfordClient, ServerInfo};
use crate::relay::{CommandRelay, GameAction, RelayedCommand};
use crate::setup::{SetupCoordinator, SetupRequest};

const ERROR_RED: Colour = Colour(0xE53935);
const SUCCESS_GREEN: Colour = Colour(0x57F287);

pub struct CommandHandler {
    setup: SetupCoordinator,
    relay: CommandRelay,
}

impl CommandHandler {
    pub fn new(database: Database, oxford: OxfordClient) -> Self {
        CommandHandler {
            setup: SetupCoordinator::new(database.clone(), oxford.clone()),
            relay: CommandRelay::new(database, oxford),
        }
    }

    /// Entry point for a slash command interaction.
    pub async fn handle_slash_command(
        &self,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        // Acknowledge immediately so Discord does not time the invocation out.
        command
            .create_interaction_response(&ctx.http, |response| {
                response
                    .kind(InteractionResponseType::DeferredChannelMessageWithSource)
                    .interaction_response_data(|message| message.ephemeral(true))
            })
            .await?;

        let embed = match command.data.name.as_str() {
            "setup" => self.handle_setup(command).await?,
            "ban" | "kick" | "run" => self.handle_relay(ctx, command).await?,
            other => {
                warn!("Received unknown command '{other}'");
                error_embed("Unknown Command", "That command is not recognized.")
            }
        };

        command
            .edit_original_interaction_response(&ctx.http, |response| response.set_embed(embed))
            .await?;
        Ok(())
    }

    async fn handle_setup(&self, command: &ApplicationCommandInteraction) -> Result<CreateEmbed> {
        let guild_id = match command.guild_id {
            Some(id) => id.to_string(),
            None => {
                return Ok(error_embed(
                    "Server Only",
                    "`/setup` can only be used inside a server.",
                ))
            }
        };

        let log_channel_id = option_str(command, "log_channel").map(str::to_string);
        let request = SetupRequest {
            guild_id: guild_id.clone(),
            server_id: required_option(command, "server_id")?.to_string(),
            api_key: required_option(command, "api_key")?.to_string(),
            log_channel_id: log_channel_id.clone(),
            requester_id: command.user.id.to_string(),
        };

        match self.setup.setup(request).await {
            Ok(info) => Ok(setup_success_embed(&info, log_channel_id.as_deref())),
            Err(e) => {
                warn!("Setup failed for guild {guild_id}: {e}");
                Ok(relay_error_embed(&e))
            }
        }
    }

    async fn handle_relay(
        &self,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<CreateEmbed> {
        let guild_id = match command.guild_id {
            Some(id) => id.to_string(),
            None => {
                return Ok(error_embed(
                    "Server Only",
                    "Game server commands can only be used inside a server.",
                ))
            }
        };

        let action = match command.data.name.as_str() {
            "ban" => GameAction::Ban {
                username: required_option(command, "username")?.to_string(),
                reason: required_option(command, "reason")?.to_string(),
            },
            "kick" => GameAction::Kick {
                username: required_option(command, "username")?.to_string(),
                reason: required_option(command, "reason")?.to_string(),
            },
            "run" => GameAction::Run {
                command: required_option(command, "command")?.to_string(),
            },
            other => return Err(anyhow!("handle_relay called for command '{other}'")),
        };

        match self.relay.relay(&guild_id, &action).await {
            Ok(outcome) => {
                info!("Relayed '{}' for guild {guild_id}", outcome.command);
                if let Some(channel_id) = outcome.log_channel_id.as_deref() {
                    post_audit_log(ctx, channel_id, &command.user.tag(), &outcome).await;
                }
                Ok(relay_success_embed(&outcome))
            }
            Err(e) => {
                warn!(
                    "Relay of '{}' failed for guild {guild_id}: {e}",
                    action.to_command_string()
                );
                Ok(relay_error_embed(&e))
            }
        }
    }
}

/// Best-effort audit trail; a failed post never fails the invocation.
async fn post_audit_log(ctx: &Context, channel_id: &str, invoker: &str, outcome: &RelayedCommand) {
    let channel = match channel_id.parse::<u64>() {
        Ok(id) => ChannelId(id),
        Err(_) => {
            warn!("Configured log channel id '{channel_id}' is not numeric");
            return;
        }
    };

    let result = channel
        .send_message(&ctx.http, |message| {
            message.embed(|embed| {
                embed
                    .title("Command Relayed")
                    .colour(SUCCESS_GREEN)
                    .field("Invoked by", invoker, true)
                    .field("Command", format!("`{}`", outcome.command), true)
                    .field("Response", &outcome.response.message, false)
                    .timestamp(chrono::Utc::now().to_rfc3339())
            })
        })
        .await;

    if let Err(e) = result {
        warn!("Failed to post audit log to channel {channel_id}: {e}");
    }
}

fn option_str<'a>(command: &'a ApplicationCommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_ref())
        .and_then(|value| value.as_str())
}

fn required_option<'a>(command: &'a ApplicationCommandInteraction, name: &str) -> Result<&'a str> {
    option_str(command, name).ok_or_else(|| {
        anyhow!(
            "missing required option '{}' on /{}",
            name,
            command.data.name
        )
    })
}

fn error_embed(title: &str, description: &str) -> CreateEmbed {
    let mut embed = CreateEmbed::default();
    embed
        .title(title)
        .colour(ERROR_RED)
        .description(description)
        .timestamp(chrono::Utc::now().to_rfc3339());
    embed
}

fn relay_error_embed(e: &RelayError) -> CreateEmbed {
    let title = match e {
        RelayError::AlreadyConfigured => "Already Configured",
        RelayError::NotConfigured => "Not Set Up",
        RelayError::ValidationFailed(_) => "Validation Failed",
        RelayError::StoreUnavailable(_) => "Internal Error",
        RelayError::RemoteError { .. } | RelayError::InvalidResponse(_) => "Oxford API Error",
    };
    error_embed(title, &e.user_message())
}

fn setup_success_embed(info: &ServerInfo, log_channel_id: Option<&str>) -> CreateEmbed {
    let mut embed = CreateEmbed::default();
    embed
        .title("Setup Complete")
        .colour(SUCCESS_GREEN)
        .description("The bot is now linked to your Oxford server.")
        .field("Server", &info.name, true)
        .field(
            "Players",
            format!("{}/{}", info.current_players, info.max_players),
            true,
        )
        .field("Join Code", format!("`{}`", info.join_code), true)
        .timestamp(chrono::Utc::now().to_rfc3339());

    if let Some(channel_id) = log_channel_id {
        embed.field("Log Channel", format!("<#{channel_id}>"), true);
    }
    embed
}

fn relay_success_embed(outcome: &RelayedCommand) -> CreateEmbed {
    let mut embed = CreateEmbed::default();
    embed
        .title("Command Sent")
        .colour(SUCCESS_GREEN)
        .description(format!("`{}`", outcome.command))
        .field("Response", &outcome.response.message, false)
        .timestamp(chrono::Utc::now().to_rfc3339());
    embed
}
