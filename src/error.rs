//! Error taxonomy for the setup and relay flows.
//!
//! Every variant is recovered at the interaction boundary and turned into a
//! single reply; none of them should ever crash the process. Remote detail is
//! kept on the variant for the logs, while [`RelayError::user_message`]
//! produces the safe summary shown to the invoking user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The backing store could not be read or written. Nothing was committed.
    #[error("configuration store unavailable: {0}")]
    StoreUnavailable(String),

    /// Setup was attempted on a guild that already holds a config.
    #[error("guild is already configured")]
    AlreadyConfigured,

    /// Credential verification against the Oxford API failed.
    #[error("credential validation failed: {0}")]
    ValidationFailed(String),

    /// A game-server command arrived before the guild ran `/setup`.
    #[error("guild is not configured")]
    NotConfigured,

    /// The Oxford API failed a command request. `status` is `None` when the
    /// request never produced an HTTP response (network error, timeout).
    #[error("Oxford API error{}: {detail}", fmt_status(.status))]
    RemoteError { status: Option<u16>, detail: String },

    /// The Oxford API answered 2xx with a body that does not parse.
    #[error("Oxford API returned an unparseable response: {0}")]
    InvalidResponse(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl RelayError {
    /// A summary safe to show the invoking user. Raw remote bodies and store
    /// internals stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::StoreUnavailable(_) => {
                "Internal storage error. Nothing was changed - please try again.".to_string()
            }
            RelayError::AlreadyConfigured => {
                "This server is already set up.\nContact the bot developer to reset.".to_string()
            }
            RelayError::ValidationFailed(reason) => {
                format!("Could not validate those credentials:\n{reason}")
            }
            RelayError::NotConfigured => {
                "This server is not set up yet. An administrator must run `/setup` first."
                    .to_string()
            }
            RelayError::RemoteError {
                status: Some(code), ..
            } => format!("The Oxford API rejected the command (HTTP {code})."),
            RelayError::RemoteError { status: None, .. } => {
                "Could not reach the Oxford API. Please try again later.".to_string()
            }
            RelayError::InvalidResponse(_) => {
                "The Oxford API returned an unexpected response. Please try again later."
                    .to_string()
            }
        }
    }
}

impl From<sqlite::Error> for RelayError {
    fn from(err: sqlite::Error) -> Self {
        RelayError::StoreUnavailable(err.to_string())
    }
}
