//! Error types for sbirc.
//!
//! `HandlerError` covers IRC command processing and knows how to turn itself
//! into a numeric reply. `RemoteError` covers the remote chat API.

use sbirc_proto::{Message, Response};
use thiserror::Error;

use crate::session::helpers::server_reply;

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors that can occur during command handling.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,

    #[error("no such channel: {0}")]
    NoSuchChannel(String),

    #[error("not on channel: {0}")]
    NotOnChannel(String),

    #[error("client quit: {0:?}")]
    Quit(Option<String>),

    #[error("remote: {0}")]
    Remote(#[from] RemoteError),
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NeedMoreParams => "need_more_params",
            Self::NoSuchChannel(_) => "no_such_channel",
            Self::NotOnChannel(_) => "not_on_channel",
            Self::Quit(_) => "quit",
            Self::Remote(_) => "remote",
        }
    }

    /// Convert to an IRC error reply message.
    ///
    /// Returns `None` for errors without a numeric; the session reports
    /// those as diagnostics instead.
    pub fn to_irc_reply(&self, server_name: &str, nick: &str, cmd_name: &str) -> Option<Message> {
        let (response, params) = match self {
            Self::NeedMoreParams => (
                Response::ERR_NEEDMOREPARAMS,
                vec![nick.to_string(), cmd_name.to_string(), "Not enough parameters".to_string()],
            ),
            Self::NoSuchChannel(chan) => (
                Response::ERR_NOSUCHCHANNEL,
                vec![nick.to_string(), chan.clone(), "No such channel".to_string()],
            ),
            Self::NotOnChannel(chan) => (
                Response::ERR_NOTONCHANNEL,
                vec![nick.to_string(), chan.clone(), "You're not on that channel".to_string()],
            ),
            Self::Quit(_) | Self::Remote(_) => return None,
        };
        Some(server_reply(server_name, response, params))
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Remote Errors (chat API)
// ============================================================================

/// Remote chat API errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("not logged in")]
    NotAuthenticated,

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}
