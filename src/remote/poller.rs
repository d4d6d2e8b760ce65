//! Long-poll loop.
//!
//! One poller runs per connection as its own task. It is the only producer
//! of [`PollBatch`]es and stops when the shutdown signal fires or the
//! receiving side of the batch channel goes away.

use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, instrument, warn};

use super::client::SbsClient;
use super::types::PollBatch;

/// Doubling retry delay with a cap.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            current: initial,
        }
    }

    /// Delay to wait now; the following call returns twice as much.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

pub struct LongPoller {
    client: SbsClient,
    events: mpsc::Sender<PollBatch>,
    shutdown: broadcast::Receiver<()>,
    backoff: Backoff,
}

impl LongPoller {
    pub fn new(
        client: SbsClient,
        events: mpsc::Sender<PollBatch>,
        shutdown: broadcast::Receiver<()>,
        backoff: Backoff,
    ) -> Self {
        Self {
            client,
            events,
            shutdown,
            backoff,
        }
    }

    #[instrument(skip(self), name = "poller")]
    pub async fn run(mut self) {
        let mut cursor = match self.client.latest_comment_id().await {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                warn!("Remote returned no comments; listening without a cursor");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read latest comment; listening without a cursor");
                None
            }
        };
        info!(cursor = ?cursor, "Long poll started");

        loop {
            let result = tokio::select! {
                _ = self.shutdown.recv() => break,
                result = self.client.listen(cursor) => result,
            };

            match result {
                Ok(resp) => {
                    self.backoff.reset();
                    crate::metrics::record_poll("ok");
                    if let Some(last_id) = resp.last_id {
                        cursor = Some(last_id);
                    }

                    let batch = PollBatch::from(resp);
                    debug!(
                        users = batch.users.len(),
                        rooms = batch.rooms.len(),
                        messages = batch.messages.len(),
                        "Delivering batch"
                    );
                    tokio::select! {
                        _ = self.shutdown.recv() => break,
                        sent = self.events.send(batch) => {
                            if sent.is_err() {
                                debug!("Batch receiver dropped");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    crate::metrics::record_poll("error");
                    let delay = self.backoff.next_delay();
                    warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "Long poll failed");
                    tokio::select! {
                        _ = self.shutdown.recv() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!("Long poll stopped");
    }
}
