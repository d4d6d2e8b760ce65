//! IRC listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// IRC listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "127.0.0.1:6667").
    pub address: SocketAddr,
    /// Maximum accepted IRC line length in bytes.
    #[serde(default = "default_max_line")]
    pub max_line: usize,
}

fn default_max_line() -> usize {
    sbirc_proto::codec::DEFAULT_MAX_LINE
}
