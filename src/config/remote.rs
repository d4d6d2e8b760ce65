//! Remote chat service configuration.

use serde::Deserialize;
use std::time::Duration;

/// Remote chat API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the API, with trailing slash.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Room that private messages are posted to as `/pm <user> <text>`.
    /// Private messages are dropped with a diagnostic when unset.
    #[serde(default)]
    pub default_room: Option<u64>,
    /// The bridge account's user id. Resolved from the login name when unset.
    #[serde(default)]
    pub self_user_id: Option<u64>,
    /// Topic shown on join (RPL_TOPIC).
    #[serde(default = "default_topic")]
    pub topic: String,
    /// First retry delay after a failed long poll, in milliseconds.
    #[serde(default = "default_retry_initial_ms")]
    pub retry_initial_ms: u64,
    /// Retry delay cap, in milliseconds.
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,
    /// Capacity of the batch channel between the poller and the connection.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl RemoteConfig {
    /// API base URL, guaranteed to end with `/`.
    pub fn base_url(&self) -> String {
        if self.api_url.ends_with('/') {
            self.api_url.clone()
        } else {
            format!("{}/", self.api_url)
        }
    }

    pub fn retry_initial(&self) -> Duration {
        Duration::from_millis(self.retry_initial_ms)
    }

    pub fn retry_max(&self) -> Duration {
        Duration::from_millis(self.retry_max_ms.max(self.retry_initial_ms))
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            default_room: None,
            self_user_id: None,
            topic: default_topic(),
            retry_initial_ms: default_retry_initial_ms(),
            retry_max_ms: default_retry_max_ms(),
            queue_depth: default_queue_depth(),
        }
    }
}

fn default_api_url() -> String {
    "https://smilebasicsource.com/api/".to_string()
}

fn default_topic() -> String {
    "https://smilebasicsource.com/chat".to_string()
}

fn default_retry_initial_ms() -> u64 {
    1000
}

fn default_retry_max_ms() -> u64 {
    60_000
}

fn default_queue_depth() -> usize {
    64
}
