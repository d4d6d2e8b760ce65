//! Gateway - TCP listener that accepts incoming IRC clients.
//!
//! Every accepted socket gets its own Connection task and its own remote
//! backend, so each client logs in to the remote with its own credentials.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use crate::config::{ListenConfig, RemoteConfig};
use crate::network::{Connection, ConnectionParams};
use crate::remote::SbsBackend;
use crate::session::{Registry, Settings};

/// The Gateway accepts incoming TCP connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    registry: Arc<Registry>,
    settings: Arc<Settings>,
    remote: RemoteConfig,
    max_line: usize,
    shutdown: broadcast::Sender<()>,
    next_id: AtomicU64,
}

impl Gateway {
    /// Bind the gateway to the configured address.
    pub async fn bind(
        listen: &ListenConfig,
        remote: RemoteConfig,
        registry: Arc<Registry>,
        settings: Arc<Settings>,
        shutdown: broadcast::Sender<()>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(listen.address).await?;
        info!(addr = %listen.address, "Plaintext listener bound");

        Ok(Self {
            listener,
            registry,
            settings,
            remote,
            max_line: listen.max_line,
            shutdown,
            next_id: AtomicU64::new(1),
        })
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    info!(%addr, id, "Connection accepted");

                    let params = ConnectionParams {
                        registry: Arc::clone(&self.registry),
                        settings: Arc::clone(&self.settings),
                        backend: Arc::new(SbsBackend::new(&self.remote)),
                        max_line: self.max_line,
                        queue_depth: self.remote.queue_depth,
                    };
                    let connection =
                        Connection::new(id, stream, addr, params, self.shutdown.subscribe());

                    tokio::spawn(async move {
                        if let Err(e) = connection.run().await {
                            error!(id, %addr, error = %e, "Connection error");
                        }
                        info!(id, %addr, "Connection closed");
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
