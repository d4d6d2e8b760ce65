//! Typed identifiers for remote rooms and users.
//!
//! Rooms and users are both numbered by the remote API. Keeping them in
//! distinct newtypes means a user id can never be used to look up a room.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote room (a "content" entry that carries chat comments).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

/// A remote user account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// IRC channel name for a room: `#` followed by the decimal room id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey(RoomId);

impl ChannelKey {
    pub fn new(room: RoomId) -> Self {
        Self(room)
    }

    /// Parse a channel name. Only the canonical form (`#5`, not `#05`) is
    /// accepted so that every room has exactly one name.
    pub fn parse(name: &str) -> Option<Self> {
        let digits = name.strip_prefix('#')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        digits.parse().ok().map(|id| Self::new(RoomId(id)))
    }

    pub fn room(&self) -> RoomId {
        self.0
    }
}

impl From<RoomId> for ChannelKey {
    fn from(room: RoomId) -> Self {
        Self::new(room)
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A user's standing, from the remote's tri-state `super` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawRank")]
pub enum Rank {
    /// `false` or `0`.
    #[default]
    Member,
    /// `true` or `1`.
    Voice,
    /// Any number of 2 or more.
    Operator,
}

impl Rank {
    /// Nickname prefix in NAMES and WHO replies.
    pub fn names_prefix(self) -> &'static str {
        match self {
            Rank::Member => "",
            Rank::Voice => "+",
            Rank::Operator => "@",
        }
    }

    /// Mode announced when a member arrives in a channel the client is in.
    pub fn arrival_mode(self) -> &'static str {
        match self {
            Rank::Member => "+v",
            Rank::Voice | Rank::Operator => "+o",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRank {
    Flag(bool),
    Level(i64),
    Other(serde::de::IgnoredAny),
}

impl From<RawRank> for Rank {
    fn from(raw: RawRank) -> Self {
        match raw {
            RawRank::Flag(false) => Rank::Member,
            RawRank::Flag(true) => Rank::Voice,
            RawRank::Level(n) if n >= 2 => Rank::Operator,
            RawRank::Level(1) => Rank::Voice,
            RawRank::Level(_) | RawRank::Other(_) => Rank::Member,
        }
    }
}
