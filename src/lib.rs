// Core layer - process configuration and error taxonomy
pub mod config;
pub mod error;

// Infrastructure - per-guild config store and Oxford API client
pub mod database;
pub mod oxford;

// Domain - one-time setup handshake and command relay
pub mod relay;
pub mod setup;

// Application layer
pub mod command_handler;
pub mod commands;
pub mod keepalive;

pub use config::Config;
pub use database::{Database, GuildConfig};
pub use error::RelayError;
