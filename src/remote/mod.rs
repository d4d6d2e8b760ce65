//! Remote chat service client.
//!
//! The session talks to the remote through the [`ChatBackend`] trait:
//! log in once, start a background long poll that feeds [`PollBatch`]es into
//! a channel, and post messages into rooms.

mod client;
mod poller;
#[cfg(test)]
pub mod testing;
mod types;

pub use client::SbsClient;
pub use poller::{Backoff, LongPoller};
pub use types::{MessageKind, PollBatch, RemoteMessage, RoomUpdate};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::state::RoomId;

/// Capability the session needs from the remote chat service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Authenticate as `username`.
    async fn login(&self, username: &str, password: &str) -> Result<(), RemoteError>;

    /// Start the long poll. Batches go to `events` until `shutdown` fires.
    fn connect(
        &self,
        events: mpsc::Sender<PollBatch>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, RemoteError>;

    /// Post `text` into `room`.
    async fn send_message(&self, room: RoomId, text: &str) -> Result<(), RemoteError>;
}

/// [`ChatBackend`] backed by the real HTTP API.
pub struct SbsBackend {
    client: SbsClient,
    backoff: Backoff,
}

impl SbsBackend {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            client: SbsClient::new(config.base_url()),
            backoff: Backoff::new(config.retry_initial(), config.retry_max()),
        }
    }
}

#[async_trait]
impl ChatBackend for SbsBackend {
    async fn login(&self, username: &str, password: &str) -> Result<(), RemoteError> {
        self.client.authenticate(username, password).await
    }

    fn connect(
        &self,
        events: mpsc::Sender<PollBatch>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, RemoteError> {
        if !self.client.is_authenticated() {
            return Err(RemoteError::NotAuthenticated);
        }
        let poller = LongPoller::new(self.client.clone(), events, shutdown, self.backoff.clone());
        Ok(tokio::spawn(poller.run()))
    }

    async fn send_message(&self, room: RoomId, text: &str) -> Result<(), RemoteError> {
        self.client.post_comment(room, text).await?;
        crate::metrics::record_relay("to_remote");
        Ok(())
    }
}
