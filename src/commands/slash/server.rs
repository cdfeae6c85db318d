//! Game-server slash commands: /ban, /kick, /run

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

/// Creates the game-server commands
pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        create_ban_command(),
        create_kick_command(),
        create_run_command(),
    ]
}

/// Creates the ban command
fn create_ban_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("ban")
        .description("Ban a player from the game server")
        .create_option(|option| {
            option
                .name("username")
                .description("In-game username")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("reason")
                .description("Reason for ban")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .to_owned()
}

/// Creates the kick command
fn create_kick_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("kick")
        .description("Kick a player from the game server")
        .create_option(|option| {
            option
                .name("username")
                .description("In-game username")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("reason")
                .description("Reason for kick")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .to_owned()
}

/// Creates the run command
fn create_run_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("run")
        .description("Run a custom server command")
        .create_option(|option| {
            option
                .name("command")
                .description("Command to run (e.g. \"time 12\")")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .to_owned()
}
