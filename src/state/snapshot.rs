//! The bridge's view of the remote chat.
//!
//! A `Snapshot` is owned by one connection and only changes when a poll
//! batch is applied to it.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::ids::{ChannelKey, Rank, RoomId, UserId};
use crate::remote::PollBatch;

/// A remote user as reported by the `user` chain.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RemoteUser {
    pub id: UserId,
    pub username: String,
    #[serde(rename = "super", default)]
    pub rank: Rank,
}

/// Rooms, users and the long-poll cursor.
#[derive(Debug, Default)]
pub struct Snapshot {
    rooms: BTreeMap<RoomId, BTreeSet<UserId>>,
    users: HashMap<UserId, RemoteUser>,
    last_id: Option<u64>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one poll batch into the snapshot.
    ///
    /// Users are upserted, deleted rooms dropped, listener lists replace a
    /// room's member set, and the cursor follows the remote's `lastId`.
    pub fn apply(&mut self, batch: &PollBatch) {
        for user in &batch.users {
            self.users.insert(user.id, user.clone());
        }

        for room in &batch.rooms {
            if room.deleted {
                self.rooms.remove(&room.id);
            } else {
                self.rooms.entry(room.id).or_default();
            }
        }

        for (room, members) in &batch.listeners {
            if batch.rooms.iter().any(|r| r.id == *room && r.deleted) {
                continue;
            }
            self.rooms.insert(*room, members.iter().copied().collect());
        }

        if let Some(last_id) = batch.last_id {
            self.last_id = Some(last_id);
        }
    }

    pub fn has_users(&self) -> bool {
        !self.users.is_empty()
    }

    pub fn has_rooms(&self) -> bool {
        !self.rooms.is_empty()
    }

    pub fn contains(&self, key: ChannelKey) -> bool {
        self.rooms.contains_key(&key.room())
    }

    pub fn user(&self, id: UserId) -> Option<&RemoteUser> {
        self.users.get(&id)
    }

    /// Exact username lookup.
    pub fn find_username(&self, name: &str) -> Option<&RemoteUser> {
        self.users.values().find(|u| u.username == name)
    }

    /// Case-insensitive username lookup.
    pub fn find_username_ignore_case(&self, name: &str) -> Option<&RemoteUser> {
        self.users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(name))
    }

    /// Members of a room whose user records are known, in user id order.
    pub fn members(&self, key: ChannelKey) -> Vec<&RemoteUser> {
        self.rooms
            .get(&key.room())
            .map(|ids| ids.iter().filter_map(|id| self.users.get(id)).collect())
            .unwrap_or_default()
    }

    /// Channel to known-member view, as diffed by the reconciler.
    pub fn membership(&self) -> BTreeMap<ChannelKey, BTreeSet<UserId>> {
        self.rooms
            .iter()
            .map(|(room, ids)| {
                let known = ids
                    .iter()
                    .copied()
                    .filter(|id| self.users.contains_key(id))
                    .collect();
                (ChannelKey::from(*room), known)
            })
            .collect()
    }

    pub fn last_id(&self) -> Option<u64> {
        self.last_id
    }
}
