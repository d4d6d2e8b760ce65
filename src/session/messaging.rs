//! PRIVMSG and NOTICE: relay client text to the remote chat.

use async_trait::async_trait;
use sbirc_proto::{Command, Message};
use std::sync::Arc;
use tracing::debug;

use super::{Handler, Session};
use crate::error::{HandlerError, HandlerResult};
use crate::translate::{self, RouteError};

pub struct PrivmsgHandler;

#[async_trait]
impl Handler for PrivmsgHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let Command::PRIVMSG(target, text) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };
        relay(session, msg, target, text).await
    }
}

pub struct NoticeHandler;

#[async_trait]
impl Handler for NoticeHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        // NOTICE never generates numerics; a failed send is still a diagnostic
        match &msg.command {
            Command::NOTICE(target, text) => relay(session, msg, target, text).await,
            _ => Ok(()),
        }
    }
}

/// Route one message to its room and post it.
///
/// Unroutable targets are reported here; send failures propagate as
/// [`HandlerError::Remote`].
async fn relay(session: &mut Session, msg: &Message, target: &str, text: &str) -> HandlerResult {
    let routed = translate::route_outgoing(
        target,
        text,
        &session.snapshot,
        session.settings.default_room,
    );
    let (room, payload) = match routed {
        Ok(routed) => routed,
        Err(RouteError::NoDefaultRoom(user)) => {
            session.diagnostic(format!(
                "Cannot message {user}: no default room configured for private messages"
            ));
            return Ok(());
        }
        Err(RouteError::Unrecognized(_)) => {
            let line = msg.to_string();
            session.diagnostic(format!("Unrecognized destination: {}", line.trim_end()));
            return Ok(());
        }
    };

    debug!(room = %room, "Relaying message to remote");
    let backend = Arc::clone(&session.backend);
    backend.send_message(room, &payload).await?;
    Ok(())
}
