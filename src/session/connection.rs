//! Registration and connection-level handlers: PASS, NICK, USER, PING, PONG, QUIT.

use async_trait::async_trait;
use sbirc_proto::{Command, Message, Prefix, Response};
use tracing::info;

use super::{Handler, Session};
use crate::error::{HandlerError, HandlerResult};

pub struct PassHandler;

#[async_trait]
impl Handler for PassHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let Command::PASS(password) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };
        session.password = password.clone();
        try_register(session).await;
        Ok(())
    }
}

pub struct NickHandler;

#[async_trait]
impl Handler for NickHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let Command::NICK(nick) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };
        // the remote account name is fixed by login
        if session.connected {
            return Ok(());
        }
        session.nick = nick.clone();
        try_register(session).await;
        Ok(())
    }
}

pub struct UserHandler;

#[async_trait]
impl Handler for UserHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let Command::USER(user, _mode, realname) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };
        if session.connected {
            session.reply(
                Response::ERR_ALREADYREGISTRED,
                vec!["You may not reregister".to_string()],
            );
            return Ok(());
        }
        session.realname = if realname.is_empty() {
            user.clone()
        } else {
            realname.clone()
        };
        try_register(session).await;
        Ok(())
    }
}

/// Complete registration once nickname, password and realname are all set.
///
/// The welcome burst goes out exactly once, followed by the remote login.
async fn try_register(session: &mut Session) {
    if session.connected
        || session.nick.is_empty()
        || session.password.is_empty()
        || session.realname.is_empty()
    {
        return;
    }
    session.connected = true;
    info!(nick = %session.nick, "Client registered");

    let network = session.settings.network.clone();
    session.reply(
        Response::RPL_WELCOME,
        vec![format!("Welcome to the {network} IRC bridge, {}", session.nick)],
    );
    session.reply(
        Response::RPL_ISUPPORT,
        vec![
            "CHANTYPES=#".to_string(),
            "PREFIX=(ov)@+".to_string(),
            format!("NETWORK={network}"),
            "are supported by this server".to_string(),
        ],
    );
    session.reply(Response::ERR_NOMOTD, vec!["MOTD File is missing".to_string()]);

    session.start_remote().await;
}

pub struct PingHandler;

#[async_trait]
impl Handler for PingHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let Command::PING(token, _) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };
        let server = session.settings.server_name.clone();
        let pong = Message::from(Command::PONG(server.clone(), Some(token.clone())))
            .with_prefix(Prefix::ServerName(server));
        session.send(pong);
        Ok(())
    }
}

pub struct PongHandler;

#[async_trait]
impl Handler for PongHandler {
    async fn handle(&self, _session: &mut Session, _msg: &Message) -> HandlerResult {
        Ok(())
    }
}

pub struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let reason = match &msg.command {
            Command::QUIT(reason) => reason.clone(),
            _ => None,
        };
        session.send(Message::from(Command::ERROR("Closing link".to_string())));
        Err(HandlerError::Quit(reason))
    }
}
