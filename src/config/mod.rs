//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig)
//! - [`listen`]: IRC listener configuration (ListenConfig)
//! - [`remote`]: Remote chat service configuration (RemoteConfig)

mod listen;
mod remote;
mod types;

pub use listen::ListenConfig;
pub use remote::RemoteConfig;
pub use types::{Config, ConfigError, ServerConfig};
