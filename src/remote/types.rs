//! Wire types for the remote chat API and their decoded forms.
//!
//! Field names on the `Wire*` structs are the API's JSON contract.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

use crate::state::{RemoteUser, RoomId, UserId};

/// A `content` entry. Rooms are content that carries comments.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RoomUpdate {
    pub id: RoomId,
    #[serde(default)]
    pub deleted: bool,
}

/// A `comment` entry as sent by the API.
#[derive(Clone, Debug, Deserialize)]
pub struct WireComment {
    pub id: u64,
    #[serde(rename = "parentId")]
    pub parent_id: RoomId,
    #[serde(rename = "createUserId")]
    pub create_user_id: UserId,
    #[serde(default)]
    pub content: String,
}

/// The `chains` object shared by `Read/chain` and `Read/listen`.
#[derive(Debug, Default, Deserialize)]
pub struct Chains {
    #[serde(default)]
    pub user: Vec<RemoteUser>,
    #[serde(default)]
    pub content: Vec<RoomUpdate>,
    #[serde(default)]
    pub comment: Vec<WireComment>,
}

/// Body of a `Read/listen` response.
#[derive(Debug, Default, Deserialize)]
pub struct ListenResponse {
    #[serde(rename = "lastId")]
    pub last_id: Option<u64>,
    #[serde(default)]
    pub chains: Chains,
    /// Room id (as a JSON object key) to the users currently in it.
    #[serde(default)]
    pub listeners: Option<HashMap<String, Vec<UserId>>>,
}

/// Whether a comment is ordinary chat or a system notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Chat,
    /// The metadata preamble's `system` field, e.g. `welcome`, `join`.
    System(String),
}

/// A decoded comment.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteMessage {
    pub id: u64,
    pub room: RoomId,
    pub author: UserId,
    /// The JSON object on the first line, if there was one.
    pub meta: Option<Map<String, Value>>,
    /// Content with the metadata line removed.
    pub text: String,
    pub kind: MessageKind,
}

impl From<WireComment> for RemoteMessage {
    fn from(comment: WireComment) -> Self {
        let (meta, text) = split_preamble(comment.content);
        let kind = meta
            .as_ref()
            .and_then(|m| m.get("system"))
            .map(|v| match v {
                Value::String(s) => MessageKind::System(s.clone()),
                other => MessageKind::System(other.to_string()),
            })
            .unwrap_or(MessageKind::Chat);
        RemoteMessage {
            id: comment.id,
            room: comment.parent_id,
            author: comment.create_user_id,
            meta,
            text,
            kind,
        }
    }
}

/// Split off the first line when it is a JSON object.
pub fn split_preamble(content: String) -> (Option<Map<String, Value>>, String) {
    if let Some((first, rest)) = content.split_once('\n')
        && let Ok(Value::Object(meta)) = serde_json::from_str::<Value>(first)
    {
        return (Some(meta), rest.to_string());
    }
    (None, content)
}

/// One long-poll result, in the order the session consumes it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PollBatch {
    pub users: Vec<RemoteUser>,
    pub rooms: Vec<RoomUpdate>,
    pub listeners: Vec<(RoomId, Vec<UserId>)>,
    pub messages: Vec<RemoteMessage>,
    pub last_id: Option<u64>,
}

impl From<ListenResponse> for PollBatch {
    fn from(resp: ListenResponse) -> Self {
        let mut listeners: Vec<(RoomId, Vec<UserId>)> = resp
            .listeners
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(room, users)| match room.parse() {
                Ok(id) => Some((RoomId(id), users)),
                Err(_) => {
                    warn!(room = %room, "Ignoring listeners for non-numeric room");
                    None
                }
            })
            .collect();
        listeners.sort_by_key(|(room, _)| *room);

        PollBatch {
            users: resp.chains.user,
            rooms: resp.chains.content,
            listeners,
            messages: resp
                .chains
                .comment
                .into_iter()
                .map(RemoteMessage::from)
                .collect(),
            last_id: resp.last_id,
        }
    }
}
