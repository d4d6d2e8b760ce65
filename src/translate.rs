//! Message translation between the remote chat and IRC.
//!
//! Remote comments become PRIVMSGs from the author's hostmask. IRC
//! PRIVMSG/NOTICE targets resolve to a room id and a remote text payload.

use sbirc_proto::{Ctcp, Message, Prefix};
use serde_json::Value;

use crate::remote::{MessageKind, RemoteMessage};
use crate::state::{ChannelKey, RemoteUser, RoomId, Snapshot, UserId};

/// `username!id@server`.
pub fn user_prefix(user: &RemoteUser, server: &str) -> Prefix {
    Prefix::new(user.username.as_str(), user.id.to_string(), server)
}

/// Hostmask for a user id, falling back to `id!id@server` when the user
/// record has not arrived yet.
pub fn author_prefix(snapshot: &Snapshot, id: UserId, server: &str) -> Prefix {
    match snapshot.user(id) {
        Some(user) => user_prefix(user, server),
        None => Prefix::new(id.to_string(), id.to_string(), server),
    }
}

/// The bridge account's user id: configured, or the user whose name matches
/// the login nickname.
pub fn resolve_self(snapshot: &Snapshot, configured: Option<UserId>, nick: &str) -> Option<UserId> {
    configured.or_else(|| snapshot.find_username_ignore_case(nick).map(|u| u.id))
}

/// Hostmask the client's own JOIN/PART echoes come from.
pub fn self_prefix(snapshot: &Snapshot, own: Option<UserId>, nick: &str, server: &str) -> Prefix {
    match own.and_then(|id| snapshot.user(id)) {
        Some(user) => user_prefix(user, server),
        None => Prefix::new(nick, nick, server),
    }
}

/// CTCP ACTION becomes the remote's `/me` command.
pub fn irc_text_to_remote(text: &str) -> String {
    match Ctcp::parse(text) {
        Some(ctcp) if ctcp.is_action() => format!("/me {}", ctcp.params.unwrap_or_default()),
        _ => text.to_string(),
    }
}

/// The remote's `/me` becomes a CTCP ACTION.
pub fn remote_line_to_irc(line: &str) -> String {
    match line.strip_prefix("/me ") {
        Some(action) => Ctcp::action(action),
        None => line.to_string(),
    }
}

/// Outcome of translating one remote comment.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    /// Lines to write to the client.
    Lines(Vec<Message>),
    /// Nothing to show.
    Suppressed,
    /// Unexpected content to report to the operator.
    Diagnostic(String),
}

/// Translate a remote comment for a client logged in as `nick`.
pub fn remote_to_irc(
    msg: &RemoteMessage,
    snapshot: &Snapshot,
    own: Option<UserId>,
    nick: &str,
    server: &str,
) -> Inbound {
    match &msg.kind {
        MessageKind::Chat => {
            if own == Some(msg.author) {
                return Inbound::Suppressed;
            }
            let channel = ChannelKey::from(msg.room).to_string();
            let prefix = author_prefix(snapshot, msg.author, server);
            let lines: Vec<Message> = text_lines(&msg.text)
                .map(|line| {
                    Message::privmsg(channel.as_str(), remote_line_to_irc(line))
                        .with_prefix(prefix.clone())
                })
                .collect();
            if lines.is_empty() {
                Inbound::Suppressed
            } else {
                Inbound::Lines(lines)
            }
        }
        MessageKind::System(kind) => match kind.as_str() {
            "welcome" => Inbound::Lines(
                text_lines(&msg.text)
                    .map(|line| {
                        Message::notice(nick, line).with_prefix(Prefix::ServerName(server.to_string()))
                    })
                    .collect(),
            ),
            "join" | "leave" => Inbound::Suppressed,
            _ => {
                if let Some(user) = snapshot.user(msg.author) {
                    let entered = format!("{} has entered the chat.", user.username);
                    let left = format!("{} has left the chat.", user.username);
                    if msg.text == entered || msg.text == left {
                        return Inbound::Suppressed;
                    }
                }
                let meta = msg
                    .meta
                    .clone()
                    .map(Value::Object)
                    .unwrap_or(Value::Null);
                Inbound::Diagnostic(format!(
                    "Unknown system message {} in {} from {}: {} {:?}",
                    msg.id,
                    ChannelKey::from(msg.room),
                    msg.author,
                    meta,
                    msg.text
                ))
            }
        },
    }
}

fn text_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
}

/// Why an outgoing message could not be routed.
#[derive(Debug, PartialEq, Eq)]
pub enum RouteError {
    /// The target is a user but no private message room is configured.
    NoDefaultRoom(String),
    /// Neither a known channel nor a known username.
    Unrecognized(String),
}

/// Resolve an IRC target and text to a room and remote payload.
pub fn route_outgoing(
    target: &str,
    text: &str,
    snapshot: &Snapshot,
    default_room: Option<RoomId>,
) -> Result<(RoomId, String), RouteError> {
    let text = irc_text_to_remote(text);

    if let Some(key) = ChannelKey::parse(target)
        && snapshot.contains(key)
    {
        return Ok((key.room(), text));
    }

    if let Some(user) = snapshot.find_username(target) {
        let room = default_room.ok_or_else(|| RouteError::NoDefaultRoom(target.to_string()))?;
        return Ok((room, format!("/pm {} {}", user.username, text)));
    }

    Err(RouteError::Unrecognized(target.to_string()))
}
