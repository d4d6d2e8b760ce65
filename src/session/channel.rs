//! Channel handlers: JOIN, PART, NAMES, MODE, WHO.
//!
//! Channels are remote rooms. Membership is owned by the remote; these
//! handlers only control which channels the client is shown as joined and
//! answer listing queries from the latest snapshot.

use async_trait::async_trait;
use sbirc_proto::{ChannelExt, Command, Message, Response};
use tracing::debug;

use super::helpers::from_user;
use super::{Handler, Session};
use crate::error::{HandlerError, HandlerResult};
use crate::state::ChannelKey;

fn split_targets(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|t| !t.is_empty())
}

pub struct JoinHandler;

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let Command::JOIN(targets, _keys) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };
        session
            .pending_joins
            .extend(split_targets(targets).map(str::to_string));
        settle_pending_joins(session);
        Ok(())
    }
}

/// Resolve every queued join against the current snapshot.
///
/// Nothing is settled until the first populated snapshot arrives, so joins
/// sent right after registration are answered once the rooms are known.
pub(super) fn settle_pending_joins(session: &mut Session) {
    if !session.snapshot.has_rooms() {
        if !session.pending_joins.is_empty() {
            debug!(pending = session.pending_joins.len(), "Deferring joins until rooms are known");
        }
        return;
    }

    let mut pending = std::mem::take(&mut session.pending_joins);
    let mut seen = std::collections::HashSet::new();
    pending.retain(|target| seen.insert(target.clone()));

    for target in pending {
        if let Err(e) = join_one(session, &target) {
            session.report(e, "JOIN");
        }
    }
}

fn join_one(session: &mut Session, target: &str) -> HandlerResult {
    let key = ChannelKey::parse(target)
        .filter(|key| session.snapshot.contains(*key))
        .ok_or_else(|| HandlerError::NoSuchChannel(target.to_string()))?;

    if !session.joined.insert(key) {
        return Ok(());
    }

    let channel = key.to_string();
    session.send(from_user(
        session.self_prefix(),
        Command::JOIN(channel.clone(), None),
    ));
    let topic = session.settings.topic.clone();
    session.reply(Response::RPL_TOPIC, vec![channel, topic]);
    send_names(session, key);
    Ok(())
}

/// One `353` per known member, then `366`.
fn send_names(session: &mut Session, key: ChannelKey) {
    let channel = key.to_string();
    let entries: Vec<String> = session
        .snapshot
        .members(key)
        .into_iter()
        .map(|user| format!("{}{}", user.rank.names_prefix(), user.username))
        .collect();
    for entry in entries {
        session.reply(
            Response::RPL_NAMREPLY,
            vec!["=".to_string(), channel.clone(), entry],
        );
    }
    end_of_names(session, channel);
}

fn end_of_names(session: &mut Session, channel: String) {
    session.reply(
        Response::RPL_ENDOFNAMES,
        vec![channel, "End of /NAMES list".to_string()],
    );
}

pub struct PartHandler;

#[async_trait]
impl Handler for PartHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let Command::PART(targets, _reason) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };
        for target in split_targets(targets) {
            let joined = ChannelKey::parse(target).filter(|key| session.joined.remove(key));
            match joined {
                Some(key) => {
                    session.send(from_user(
                        session.self_prefix(),
                        Command::PART(key.to_string(), None),
                    ));
                }
                None => session.report(HandlerError::NotOnChannel(target.to_string()), "PART"),
            }
        }
        Ok(())
    }
}

pub struct NamesHandler;

#[async_trait]
impl Handler for NamesHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let targets: Vec<String> = match &msg.command {
            Command::NAMES(Some(list)) => split_targets(list).map(str::to_string).collect(),
            _ => session.joined.iter().map(ChannelKey::to_string).collect(),
        };
        for target in targets {
            match ChannelKey::parse(&target).filter(|key| session.snapshot.contains(*key)) {
                Some(key) => send_names(session, key),
                None => end_of_names(session, target),
            }
        }
        Ok(())
    }
}

pub struct ModeHandler;

#[async_trait]
impl Handler for ModeHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let Command::MODE(target, _changes) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };
        // user mode queries are ignored
        if target.is_channel_name() {
            session.reply(
                Response::RPL_CHANNELMODEIS,
                vec![target.clone(), "+t".to_string()],
            );
        }
        Ok(())
    }
}

pub struct WhoHandler;

#[async_trait]
impl Handler for WhoHandler {
    async fn handle(&self, session: &mut Session, msg: &Message) -> HandlerResult {
        let mask = match &msg.command {
            Command::WHO(Some(mask)) => mask.clone(),
            _ => "*".to_string(),
        };

        if let Some(key) = ChannelKey::parse(&mask) {
            let server = session.settings.server_name.clone();
            let rows: Vec<Vec<String>> = session
                .snapshot
                .members(key)
                .into_iter()
                .map(|user| {
                    vec![
                        mask.clone(),
                        user.id.to_string(),
                        server.clone(),
                        server.clone(),
                        user.username.clone(),
                        format!("G{}", user.rank.names_prefix()),
                        format!("0 {}", user.username),
                    ]
                })
                .collect();
            for row in rows {
                session.reply(Response::RPL_WHOREPLY, row);
            }
        }

        session.reply(
            Response::RPL_ENDOFWHO,
            vec![mask, "End of /WHO list.".to_string()],
        );
        Ok(())
    }
}
