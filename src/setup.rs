//! One-time guild configuration handshake.
//!
//! Credentials are verified live against the Oxford API before anything is
//! persisted, and the conditional insert in the store closes the race between
//! two concurrent `/setup` calls for the same guild: exactly one wins.

use chrono::Utc;
use log::{info, warn};

use crate::database::{Database, GuildConfig};
use crate::error::RelayError;
use crate::oxford::{OxfordClient, ServerInfo};

/// Arguments of a `/setup` invocation.
#[derive(Clone)]
pub struct SetupRequest {
    pub guild_id: String,
    pub server_id: String,
    pub api_key: String,
    pub log_channel_id: Option<String>,
    pub requester_id: String,
}

pub struct SetupCoordinator {
    database: Database,
    oxford: OxfordClient,
}

impl SetupCoordinator {
    pub fn new(database: Database, oxford: OxfordClient) -> Self {
        SetupCoordinator { database, oxford }
    }

    /// Runs the check, verify, persist sequence for one guild.
    ///
    /// Verification always precedes persistence: no record is ever written
    /// for credentials that were not confirmed against the Oxford API. A
    /// store failure after validation leaves nothing committed and the user
    /// may simply re-invoke setup.
    pub async fn setup(&self, request: SetupRequest) -> Result<ServerInfo, RelayError> {
        if self
            .database
            .get_guild_config(&request.guild_id)
            .await?
            .is_some()
        {
            return Err(RelayError::AlreadyConfigured);
        }

        let info = self
            .oxford
            .fetch_server_info(&request.server_id, &request.api_key)
            .await?;

        let config = GuildConfig {
            guild_id: request.guild_id,
            server_id: request.server_id,
            api_key: request.api_key,
            log_channel_id: request.log_channel_id,
            setup_by: request.requester_id,
            setup_at: Utc::now(),
        };

        if !self.database.insert_guild_config(&config).await? {
            // Another invocation won the race between the check and the write.
            warn!(
                "Guild {} was configured concurrently, discarding validated credentials",
                config.guild_id
            );
            return Err(RelayError::AlreadyConfigured);
        }

        info!(
            "Guild {} linked to server '{}' ({}) by {} (api key {})",
            config.guild_id,
            info.name,
            config.server_id,
            config.setup_by,
            config.masked_api_key()
        );
        Ok(info)
    }
}
