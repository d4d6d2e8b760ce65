//! Bridge state: the remote snapshot and the reconciliation engine.
//!
//! - [`ids`]: Typed identifiers (RoomId, UserId, ChannelKey) and Rank
//! - [`snapshot`]: The in-memory view of rooms, users and the poll cursor
//! - [`reconcile`]: Diffing successive snapshots into IRC membership events

mod ids;
mod reconcile;
mod snapshot;

pub use ids::{ChannelKey, Rank, RoomId, UserId};
pub use reconcile::{MembershipEvent, Reconciler, Reconciliation};
pub use snapshot::{RemoteUser, Snapshot};
