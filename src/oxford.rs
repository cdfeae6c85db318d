//! Typed client for the Oxford game-server management API.
//!
//! Responses are validated into concrete shapes at this boundary; anything
//! that does not conform is rejected instead of being passed along.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::RelayError;

pub const DEFAULT_BASE_URL: &str = "https://api.oxfd.re";

/// Remote calls that hang longer than this are treated as failed.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How much of a remote body is kept for diagnostics.
const BODY_SNIPPET_LEN: usize = 200;

/// Server metadata returned by `GET /v1/server`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerInfo {
    pub name: String,
    pub current_players: u32,
    pub max_players: u32,
    pub join_code: String,
    pub owner_id: String,
}

/// Result of `POST /v1/server/command`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandResponse {
    pub message: String,
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    command: &'a str,
}

#[derive(Clone)]
pub struct OxfordClient {
    http: reqwest::Client,
    base_url: String,
}

impl OxfordClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(OxfordClient {
            http,
            base_url: base_url.into(),
        })
    }

    /// Verifies credentials and fetches server metadata.
    ///
    /// Only the setup flow calls this, so every failure mode maps to
    /// [`RelayError::ValidationFailed`].
    pub async fn fetch_server_info(
        &self,
        server_id: &str,
        api_key: &str,
    ) -> Result<ServerInfo, RelayError> {
        let response = self
            .http
            .get(format!("{}/v1/server", self.base_url))
            .header("server-id", server_id)
            .header("server-key", api_key)
            .send()
            .await
            .map_err(|e| {
                RelayError::ValidationFailed(format!("could not reach the Oxford API: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            RelayError::ValidationFailed(format!("failed to read the Oxford API response: {e}"))
        })?;

        if !status.is_success() {
            return Err(RelayError::ValidationFailed(format!(
                "the Oxford API rejected the credentials (HTTP {}): {}",
                status.as_u16(),
                snippet(&body)
            )));
        }

        serde_json::from_str(&body).map_err(|_| {
            RelayError::ValidationFailed(format!(
                "the Oxford API returned an unrecognized server description: {}",
                snippet(&body)
            ))
        })
    }

    /// Sends one command string to the server's command endpoint.
    pub async fn send_command(
        &self,
        server_id: &str,
        api_key: &str,
        command: &str,
    ) -> Result<CommandResponse, RelayError> {
        let response = self
            .http
            .post(format!("{}/v1/server/command", self.base_url))
            .header("server-id", server_id)
            .header("server-key", api_key)
            .json(&CommandRequest { command })
            .send()
            .await
            .map_err(|e| RelayError::RemoteError {
                status: None,
                detail: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| RelayError::RemoteError {
            status: Some(status.as_u16()),
            detail: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(RelayError::RemoteError {
                status: Some(status.as_u16()),
                detail: snippet(&body),
            });
        }

        serde_json::from_str(&body).map_err(|_| RelayError::InvalidResponse(snippet(&body)))
    }
}

/// Truncates a remote body for logs without splitting a UTF-8 character.
fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= BODY_SNIPPET_LEN {
        return trimmed.to_string();
    }
    let mut end = BODY_SNIPPET_LEN;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
