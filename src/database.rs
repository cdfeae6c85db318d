//! Per-guild configuration store backed by sqlite.
//!
//! One row per guild, created fully formed by the setup flow and never
//! mutated afterwards. The conditional insert is the primitive that keeps
//! concurrent `/setup` calls for the same guild from silently overwriting
//! each other.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::info;
use sqlite::{Connection, State};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::RelayError;

/// A guild's Oxford credentials and setup provenance.
#[derive(Clone, PartialEq, Eq)]
pub struct GuildConfig {
    pub guild_id: String,
    pub server_id: String,
    pub api_key: String,
    pub log_channel_id: Option<String>,
    pub setup_by: String,
    pub setup_at: DateTime<Utc>,
}

impl GuildConfig {
    /// The api key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

// The api key is a secret; keep it out of Debug output and logs.
impl fmt::Debug for GuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuildConfig")
            .field("guild_id", &self.guild_id)
            .field("server_id", &self.server_id)
            .field("api_key", &self.masked_api_key())
            .field("log_channel_id", &self.log_channel_id)
            .field("setup_by", &self.setup_by)
            .field("setup_at", &self.setup_at)
            .finish()
    }
}

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    pub async fn new(database_path: &str) -> Result<Self> {
        let connection = sqlite::open(database_path)?;
        let db = Database {
            connection: Arc::new(Mutex::new(connection)),
        };

        db.init_tables().await?;
        info!("Database initialized at: {database_path}");
        Ok(db)
    }

    async fn init_tables(&self) -> Result<()> {
        let conn = self.connection.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS guild_configs (
                guild_id TEXT PRIMARY KEY,
                server_id TEXT NOT NULL,
                api_key TEXT NOT NULL,
                log_channel_id TEXT,
                setup_by TEXT NOT NULL,
                setup_at TEXT NOT NULL
            )",
        )?;

        Ok(())
    }

    /// Looks up a guild's stored config. An absent row is `Ok(None)`, not an
    /// error; an unreadable store is [`RelayError::StoreUnavailable`].
    pub async fn get_guild_config(
        &self,
        guild_id: &str,
    ) -> Result<Option<GuildConfig>, RelayError> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "SELECT guild_id, server_id, api_key, log_channel_id, setup_by, setup_at
             FROM guild_configs WHERE guild_id = ?",
        )?;
        statement.bind((1, guild_id))?;

        match statement.next()? {
            State::Row => {
                let setup_at_raw = statement.read::<String, _>("setup_at")?;
                let setup_at = DateTime::parse_from_rfc3339(&setup_at_raw)
                    .map_err(|e| {
                        RelayError::StoreUnavailable(format!(
                            "corrupt setup_at for guild {guild_id}: {e}"
                        ))
                    })?
                    .with_timezone(&Utc);

                Ok(Some(GuildConfig {
                    guild_id: statement.read::<String, _>("guild_id")?,
                    server_id: statement.read::<String, _>("server_id")?,
                    api_key: statement.read::<String, _>("api_key")?,
                    log_channel_id: statement.read::<Option<String>, _>("log_channel_id")?,
                    setup_by: statement.read::<String, _>("setup_by")?,
                    setup_at,
                }))
            }
            State::Done => Ok(None),
        }
    }

    /// Persists a guild config only if no row exists for that guild yet.
    /// Returns whether the row was written.
    pub async fn insert_guild_config(&self, config: &GuildConfig) -> Result<bool, RelayError> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "INSERT OR IGNORE INTO guild_configs
             (guild_id, server_id, api_key, log_channel_id, setup_by, setup_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        statement.bind((1, config.guild_id.as_str()))?;
        statement.bind((2, config.server_id.as_str()))?;
        statement.bind((3, config.api_key.as_str()))?;
        statement.bind((4, config.log_channel_id.as_deref()))?;
        statement.bind((5, config.setup_by.as_str()))?;
        statement.bind((6, config.setup_at.to_rfc3339().as_str()))?;
        statement.next()?;

        Ok(conn.change_count() > 0)
    }
}
