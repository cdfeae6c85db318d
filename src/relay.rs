//! Forwards a configured guild's game-server commands to the Oxford API.

use log::debug;

use crate::database::Database;
use crate::error::RelayError;
use crate::oxford::{CommandResponse, OxfordClient};

/// The fixed set of relayable actions.
#[derive(Debug, Clone)]
pub enum GameAction {
    Ban { username: String, reason: String },
    Kick { username: String, reason: String },
    /// Passed through verbatim; the remote API owns the command grammar.
    Run { command: String },
}

impl GameAction {
    /// Builds the remote command string.
    pub fn to_command_string(&self) -> String {
        match self {
            GameAction::Ban { username, reason } => format!("ban {username} {reason}"),
            GameAction::Kick { username, reason } => format!("kick {username} {reason}"),
            GameAction::Run { command } => command.clone(),
        }
    }
}

/// A relayed command and what the game server answered.
#[derive(Debug, Clone)]
pub struct RelayedCommand {
    pub command: String,
    pub response: CommandResponse,
    /// Audit destination from the guild's config, if one was set up.
    pub log_channel_id: Option<String>,
}

pub struct CommandRelay {
    database: Database,
    oxford: OxfordClient,
}

impl CommandRelay {
    pub fn new(database: Database, oxford: OxfordClient) -> Self {
        CommandRelay { database, oxford }
    }

    /// Executes one at-most-once remote invocation for a configured guild.
    /// No retries, no batching; an unconfigured guild never reaches the API.
    pub async fn relay(
        &self,
        guild_id: &str,
        action: &GameAction,
    ) -> Result<RelayedCommand, RelayError> {
        let config = self
            .database
            .get_guild_config(guild_id)
            .await?
            .ok_or(RelayError::NotConfigured)?;

        let command = action.to_command_string();
        debug!(
            "Relaying '{command}' to server {} for guild {guild_id}",
            config.server_id
        );

        let response = self
            .oxford
            .send_command(&config.server_id, &config.api_key, &command)
            .await?;

        Ok(RelayedCommand {
            command,
            response,
            log_channel_id: config.log_channel_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ban_command_string() {
        let action = GameAction::Ban {
            username: "alice".to_string(),
            reason: "cheating".to_string(),
        };
        assert_eq!(action.to_command_string(), "ban alice cheating");
    }

    #[test]
    fn kick_command_string() {
        let action = GameAction::Kick {
            username: "bob".to_string(),
            reason: "spamming chat".to_string(),
        };
        assert_eq!(action.to_command_string(), "kick bob spamming chat");
    }

    #[test]
    fn run_passes_through_verbatim() {
        let action = GameAction::Run {
            command: "time 12".to_string(),
        };
        assert_eq!(action.to_command_string(), "time 12");
    }
}
