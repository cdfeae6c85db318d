//! The /setup slash command: one-time guild configuration.

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::permissions::Permissions;

/// Creates the setup command (server administrators only)
pub fn create_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("setup")
        .description("Link this Discord server to your Oxford game server")
        .default_member_permissions(Permissions::ADMINISTRATOR)
        .create_option(|option| {
            option
                .name("server_id")
                .description("Your Oxford server ID")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("api_key")
                .description("Your Oxford API key")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("log_channel")
                .description("Channel for relay audit logs")
                .kind(CommandOptionType::Channel)
                .required(false)
        })
        .to_owned()
}
