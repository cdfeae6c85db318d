//! Process configuration from environment variables.
//!
//! Required variables are validated at startup; a missing one is a fatal
//! error before the gateway connection is attempted.

use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_KEEPALIVE_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token (required).
    pub discord_token: String,
    /// Discord application id, used for slash command registration (required).
    pub application_id: u64,
    /// Restricts command registration to one guild for faster dev iteration.
    pub discord_guild_id: Option<String>,
    pub database_path: String,
    /// Port for the hosting platform's liveness checks.
    pub keepalive_port: u16,
    pub log_level: String,
    /// Overrides the Oxford API base URL, mainly for local testing.
    pub oxford_api_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN environment variable not set"))?,
            application_id: env::var("CLIENT_ID")
                .map_err(|_| anyhow::anyhow!("CLIENT_ID environment variable not set"))?
                .parse()
                .context("CLIENT_ID must be a numeric Discord application id")?,
            discord_guild_id: env::var("DISCORD_GUILD_ID").ok(),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "oxbot.db".to_string()),
            keepalive_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_KEEPALIVE_PORT.to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            oxford_api_url: env::var("OXFORD_API_URL").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-global, so the missing-required and
    // defaults cases run inside one test to avoid interleaving.
    #[test]
    fn from_env_validates_and_defaults() {
        env::remove_var("DISCORD_TOKEN");
        env::remove_var("CLIENT_ID");
        assert!(Config::from_env().is_err());

        env::set_var("DISCORD_TOKEN", "test_discord_token");
        env::remove_var("CLIENT_ID");
        assert!(Config::from_env().is_err());

        env::set_var("CLIENT_ID", "not-a-number");
        assert!(Config::from_env().is_err());

        env::set_var("CLIENT_ID", "123456789");
        env::remove_var("DISCORD_GUILD_ID");
        env::remove_var("DATABASE_PATH");
        env::remove_var("PORT");
        env::remove_var("LOG_LEVEL");
        env::remove_var("OXFORD_API_URL");

        let config = Config::from_env().unwrap();
        assert_eq!(config.discord_token, "test_discord_token");
        assert_eq!(config.application_id, 123456789);
        assert_eq!(config.discord_guild_id, None);
        assert_eq!(config.database_path, "oxbot.db");
        assert_eq!(config.keepalive_port, DEFAULT_KEEPALIVE_PORT);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.oxford_api_url, None);

        env::remove_var("DISCORD_TOKEN");
        env::remove_var("CLIENT_ID");
    }
}
