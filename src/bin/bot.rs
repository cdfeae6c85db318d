//! Oxford relay bot gateway entry point.
//!
//! Connects a single Discord bot, registers the slash commands on Ready
//! (guild-scoped in development, global in production), and serves a
//! keep-alive endpoint for the hosting platform.

use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use serenity::async_trait;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::Arc;

use oxbot::command_handler::CommandHandler;
use oxbot::commands::{register_global_commands, register_guild_commands};
use oxbot::config::Config;
use oxbot::database::Database;
use oxbot::keepalive;
use oxbot::oxford::OxfordClient;

struct Handler {
    command_handler: Arc<CommandHandler>,
    guild_id: Option<GuildId>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected and ready!", ready.user.name);
        info!("Connected to {} guilds", ready.guilds.len());
        info!("Bot ID: {}", ready.user.id);

        if let Some(guild_id) = self.guild_id {
            info!("Development mode: registering commands for guild {guild_id}");
            if let Err(e) = register_guild_commands(&ctx, guild_id).await {
                error!("Failed to register guild slash commands: {e}");
            }
        } else {
            info!("Production mode: registering commands globally");
            if let Err(e) = register_global_commands(&ctx).await {
                error!("Failed to register global slash commands: {e}");
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::ApplicationCommand(command) => {
                if let Err(e) = self
                    .command_handler
                    .handle_slash_command(&ctx, &command)
                    .await
                {
                    error!(
                        "Error handling slash command '{}': {e}",
                        command.data.name
                    );

                    let error_message =
                        "Sorry, something went wrong processing that command. Please try again.";

                    #[allow(clippy::redundant_pattern_matching)]
                    if let Err(_) = command
                        .edit_original_interaction_response(&ctx.http, |response| {
                            response.content(error_message)
                        })
                        .await
                    {
                        let _ = command
                            .create_interaction_response(&ctx.http, |response| {
                                response
                                    .kind(InteractionResponseType::ChannelMessageWithSource)
                                    .interaction_response_data(|message| {
                                        message.content(error_message)
                                    })
                            })
                            .await;
                    }
                }
            }
            Interaction::Ping(_) => {
                info!("Ping interaction received");
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.log_level),
    )
    .init();

    info!("Starting Oxford relay bot...");

    let database = Database::new(&config.database_path).await?;
    let oxford = match &config.oxford_api_url {
        Some(url) => OxfordClient::with_base_url(url.clone())?,
        None => OxfordClient::new()?,
    };
    let command_handler = Arc::new(CommandHandler::new(database, oxford));

    // Parse guild ID for dev mode
    let guild_id = config
        .discord_guild_id
        .as_ref()
        .and_then(|id| id.parse::<u64>().ok())
        .map(GuildId);

    let handler = Handler {
        command_handler,
        guild_id,
    };

    let mut client = Client::builder(&config.discord_token, GatewayIntents::GUILDS)
        .application_id(config.application_id)
        .event_handler(handler)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Discord client: {e}"))?;

    // Liveness endpoint for the hosting platform
    let port = config.keepalive_port;
    tokio::spawn(async move {
        if let Err(e) = keepalive::serve(port).await {
            error!("Keep-alive server failed: {e}");
        }
    });

    // Graceful shutdown on Ctrl+C
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down...");
                shard_manager.lock().await.shutdown_all().await;
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {e}");
            }
        }
    });

    info!("Connecting to Discord gateway...");
    client
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Gateway connection failed: {e}"))?;

    Ok(())
}
