//! Command handler registry and dispatch.

use async_trait::async_trait;
use sbirc_proto::Message;
use std::collections::HashMap;
use tracing::{Instrument, Level, debug, span};

use super::Session;
use super::channel::{JoinHandler, ModeHandler, NamesHandler, PartHandler, WhoHandler};
use super::connection::{NickHandler, PassHandler, PingHandler, PongHandler, QuitHandler, UserHandler};
use super::messaging::{NoticeHandler, PrivmsgHandler};
use crate::error::HandlerResult;
use crate::metrics::CommandTimer;

/// A handler for one IRC verb.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult;
}

/// Registry of command handlers, shared by every connection.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Connection/registration handlers
        handlers.insert("PASS", Box::new(PassHandler));
        handlers.insert("NICK", Box::new(NickHandler));
        handlers.insert("USER", Box::new(UserHandler));
        handlers.insert("PING", Box::new(PingHandler));
        handlers.insert("PONG", Box::new(PongHandler));
        handlers.insert("QUIT", Box::new(QuitHandler));

        // Channel handlers
        handlers.insert("JOIN", Box::new(JoinHandler));
        handlers.insert("PART", Box::new(PartHandler));
        handlers.insert("NAMES", Box::new(NamesHandler));
        handlers.insert("MODE", Box::new(ModeHandler));
        handlers.insert("WHO", Box::new(WhoHandler));

        // Messaging handlers
        handlers.insert("PRIVMSG", Box::new(PrivmsgHandler));
        handlers.insert("NOTICE", Box::new(NoticeHandler));

        Self { handlers }
    }

    /// Dispatch a message to the handler for its verb.
    ///
    /// Unknown verbs are logged and ignored.
    pub async fn dispatch(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let cmd_name = msg.command_name();

        let Some(handler) = self.handlers.get(cmd_name.as_str()) else {
            debug!(command = %cmd_name, "Ignoring unsupported command");
            // fixed label: verbs are client-chosen
            crate::metrics::record_command_error("UNKNOWN", "unknown_command");
            return Ok(());
        };

        let irc_span = span!(
            Level::DEBUG,
            "irc.command",
            command = %cmd_name,
            nick = %session.nick_or_star(),
        );
        let _timer = CommandTimer::new(&cmd_name);

        let result = handler.handle(session, msg).instrument(irc_span).await;
        if let Err(ref e) = result {
            crate::metrics::record_command_error(&cmd_name, e.error_code());
            debug!(command = %cmd_name, error = %e, "Command error");
        }
        result
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
