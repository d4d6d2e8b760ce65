//! Reconciliation engine.
//!
//! Turns successive snapshots into the IRC membership events a client needs
//! to keep its channel view consistent with the remote. Only the previous
//! view is remembered, so applying the same snapshot twice is a no-op.

use std::collections::{BTreeMap, BTreeSet};

use super::ids::{ChannelKey, UserId};
use super::snapshot::Snapshot;

/// One membership change to announce to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipEvent {
    /// The room vanished; the client leaves it.
    SelfPart(ChannelKey),
    /// A member appeared in a joined channel.
    MemberJoin { channel: ChannelKey, user: UserId },
    /// Mode announced right after a `MemberJoin`.
    MemberMode {
        channel: ChannelKey,
        user: UserId,
        mode: &'static str,
    },
    /// A member left a joined channel.
    MemberPart { channel: ChannelKey, user: UserId },
}

/// Result of one reconciliation step.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Events in the order they must be sent.
    pub events: Vec<MembershipEvent>,
    /// Channels that did not exist in the previous view.
    pub new_channels: Vec<ChannelKey>,
}

/// Remembers the previous channel to member view.
#[derive(Debug, Default)]
pub struct Reconciler {
    previous: BTreeMap<ChannelKey, BTreeSet<UserId>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff `snapshot` against the previous view.
    ///
    /// Channels that disappeared are removed from `joined`. Returns `None`
    /// while no users are known, leaving the previous view untouched.
    pub fn update(
        &mut self,
        snapshot: &Snapshot,
        joined: &mut BTreeSet<ChannelKey>,
    ) -> Option<Reconciliation> {
        if !snapshot.has_users() {
            return None;
        }

        let current = snapshot.membership();
        let new_channels: Vec<ChannelKey> = current
            .keys()
            .filter(|key| !self.previous.contains_key(key))
            .copied()
            .collect();

        let mut events = Vec::new();

        // joined must stay a subset of the current channel set
        let vanished: Vec<ChannelKey> = joined
            .iter()
            .filter(|key| !current.contains_key(key))
            .copied()
            .collect();
        for key in vanished {
            joined.remove(&key);
            events.push(MembershipEvent::SelfPart(key));
        }

        let empty = BTreeSet::new();
        for key in joined.iter() {
            let before = self.previous.get(key).unwrap_or(&empty);
            let Some(after) = current.get(key) else {
                continue;
            };

            for &id in after.difference(before) {
                let Some(user) = snapshot.user(id) else {
                    continue;
                };
                events.push(MembershipEvent::MemberJoin {
                    channel: *key,
                    user: id,
                });
                events.push(MembershipEvent::MemberMode {
                    channel: *key,
                    user: id,
                    mode: user.rank.arrival_mode(),
                });
            }

            for &id in before.difference(after) {
                events.push(MembershipEvent::MemberPart {
                    channel: *key,
                    user: id,
                });
            }
        }

        self.previous = current;
        Some(Reconciliation {
            events,
            new_channels,
        })
    }
}
