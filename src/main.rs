//! sbirc - IRC bridge for the SmileBASIC Source chat.
//!
//! Remote rooms show up as `#<room id>` channels, remote users as IRC users.
//! Each IRC client logs in to the remote with its PASS/NICK and gets its own
//! long-poll session.

mod config;
mod error;
mod http;
mod metrics;
mod network;
mod remote;
mod session;
mod state;
mod translate;

use crate::config::Config;
use crate::network::Gateway;
use crate::session::{Registry, Settings};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        server = %config.server.name,
        network = %config.server.network,
        api = %config.remote.base_url(),
        "Starting sbirc"
    );
    if config.remote.default_room.is_none() {
        info!("No default room configured; private messages will be rejected");
    }

    // Prometheus metrics are optional.
    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.server.metrics_port.unwrap_or(9090);
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        info!("Metrics initialized");

        tokio::spawn(async move {
            http::run_http_server(metrics_port).await;
        });
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    let registry = Arc::new(Registry::new());
    let settings = Arc::new(Settings::from_config(&config));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let gateway = Gateway::bind(
        &config.listen,
        config.remote.clone(),
        registry,
        settings,
        shutdown_tx.clone(),
    )
    .await?;

    tokio::select! {
        result = gateway.run() => result?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutting down");
            let _ = shutdown_tx.send(());
            // let connections say goodbye before the runtime drops them
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }
    }

    Ok(())
}
