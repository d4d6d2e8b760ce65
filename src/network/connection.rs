//! Connection - drives one IRC client.
//!
//! Each Connection runs in its own Tokio task and multiplexes three inputs:
//!
//! ```text
//!   client lines ──▶ Registry ──┐
//!                               ├──▶ Session ──▶ outbox ──▶ client
//!   remote batches ─────────────┘
//!   process shutdown ──▶ ERROR, close
//! ```
//!
//! Both inputs are handled to completion inside one `select!` arm, so a poll
//! batch is never applied while a command is half processed.

use futures_util::{SinkExt, StreamExt};
use sbirc_proto::{Command, IrcCodec, Message, ProtocolError};
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument, warn};

use crate::remote::ChatBackend;
use crate::session::{Registry, Session, Settings};

/// A client connection handler.
pub struct Connection {
    id: u64,
    addr: SocketAddr,
    stream: TcpStream,
    registry: Arc<Registry>,
    settings: Arc<Settings>,
    backend: Arc<dyn ChatBackend>,
    max_line: usize,
    queue_depth: usize,
    shutdown: broadcast::Receiver<()>,
}

/// Per-connection parameters that come from configuration.
pub struct ConnectionParams {
    pub registry: Arc<Registry>,
    pub settings: Arc<Settings>,
    pub backend: Arc<dyn ChatBackend>,
    pub max_line: usize,
    pub queue_depth: usize,
}

impl Connection {
    pub fn new(
        id: u64,
        stream: TcpStream,
        addr: SocketAddr,
        params: ConnectionParams,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            id,
            addr,
            stream,
            registry: params.registry,
            settings: params.settings,
            backend: params.backend,
            max_line: params.max_line,
            queue_depth: params.queue_depth,
            shutdown,
        }
    }

    /// Run the connection until the client leaves or the process shuts down.
    #[instrument(skip(self), fields(id = self.id, addr = %self.addr), name = "connection")]
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("Client connected");
        crate::metrics::client_connected();

        let mut framed = Framed::new(self.stream, IrcCodec::with_max_len(self.max_line));
        let (events_tx, mut events_rx) = mpsc::channel(self.queue_depth.max(1));
        let mut session = Session::new(Arc::clone(&self.settings), self.backend, events_tx);

        let result = loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    info!("Server shutting down, closing connection");
                    let bye = Message::from(Command::ERROR("Server shutting down".to_string()));
                    let _ = framed.send(bye).await;
                    break Ok(());
                }

                incoming = framed.next() => {
                    let msg = match incoming {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => {
                            warn!(error = %e, "Read error");
                            break Ok(());
                        }
                        None => {
                            info!("Client disconnected");
                            break Ok(());
                        }
                    };
                    debug!(raw = %msg.to_string().trim_end(), "Received message");

                    let flow = session.handle_message(&self.registry, &msg).await;
                    if let Err(e) = flush(&mut framed, &mut session).await {
                        break Err(e);
                    }
                    if let ControlFlow::Break(reason) = flow {
                        info!(reason = ?reason, "Client quit");
                        break Ok(());
                    }
                }

                Some(batch) = events_rx.recv() => {
                    session.apply_batch(batch);
                    if let Err(e) = flush(&mut framed, &mut session).await {
                        break Err(e);
                    }
                }
            }
        };

        session.shutdown();
        crate::metrics::client_disconnected();
        result
    }
}

/// Write every queued line, then flush once.
///
/// Lines the codec refuses (embedded CR/LF/NUL) are dropped with a warning.
async fn flush(
    framed: &mut Framed<TcpStream, IrcCodec>,
    session: &mut Session,
) -> anyhow::Result<()> {
    let out = session.take_output();
    if out.is_empty() {
        return Ok(());
    }
    let count = out.len();
    for msg in out {
        match framed.feed(msg).await {
            Ok(()) => {}
            Err(ProtocolError::IllegalControlChar(text)) => {
                warn!(text = %text, "Dropping line with control characters");
            }
            Err(e) => return Err(e.into()),
        }
    }
    framed.flush().await?;
    crate::metrics::record_sent(count);
    Ok(())
}
