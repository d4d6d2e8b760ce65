//! Prometheus metrics for the bridge.
//!
//! Exposed on the optional HTTP endpoint (see [`crate::http`]).
//!
//! - `sbirc_connected_clients` - IRC clients currently connected
//! - `sbirc_messages_sent_total` - lines written to clients
//! - `sbirc_command_total{command}` - commands processed by verb
//! - `sbirc_command_duration_seconds{command}` - command latency
//! - `sbirc_command_errors_total{command,error}` - handler errors
//! - `sbirc_remote_polls_total{result}` - long-poll round trips
//! - `sbirc_messages_relayed_total{direction}` - messages bridged each way

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;
use std::time::Instant;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Currently connected IRC clients.
pub static CONNECTED_CLIENTS: OnceLock<IntGauge> = OnceLock::new();

/// Total lines written to IRC clients.
pub static MESSAGES_SENT: OnceLock<IntCounter> = OnceLock::new();

/// Commands processed by type (PRIVMSG, JOIN, PART, etc.).
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Command processing latency by command type.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Command errors by type and error kind.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Long-poll requests by outcome (`ok` / `error`).
pub static REMOTE_POLLS: OnceLock<IntCounterVec> = OnceLock::new();

/// Messages bridged, by direction (`to_irc` / `to_remote`).
pub static MESSAGES_RELAYED: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup. Recording before `init` is a no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(CONNECTED_CLIENTS, IntGauge::new("sbirc_connected_clients", "Currently connected IRC clients"));
    register!(MESSAGES_SENT, IntCounter::new("sbirc_messages_sent_total", "Lines written to IRC clients"));
    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("sbirc_command_total", "IRC commands processed by type"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("sbirc_command_duration_seconds", "IRC command latency by type")
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("sbirc_command_errors_total", "IRC command errors by type"), &["command", "error"]));
    register!(REMOTE_POLLS, IntCounterVec::new(Opts::new("sbirc_remote_polls_total", "Remote long-poll requests by result"), &["result"]));
    register!(MESSAGES_RELAYED, IntCounterVec::new(Opts::new("sbirc_messages_relayed_total", "Messages bridged by direction"), &["direction"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = COMMAND_COUNTER.get() {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a command error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    if let Some(c) = COMMAND_ERRORS.get() {
        c.with_label_values(&[command, error]).inc();
    }
}

#[inline]
pub fn record_poll(result: &str) {
    if let Some(c) = REMOTE_POLLS.get() {
        c.with_label_values(&[result]).inc();
    }
}

#[inline]
pub fn record_relay(direction: &str) {
    if let Some(c) = MESSAGES_RELAYED.get() {
        c.with_label_values(&[direction]).inc();
    }
}

#[inline]
pub fn record_sent(lines: usize) {
    if let Some(c) = MESSAGES_SENT.get() {
        c.inc_by(lines as u64);
    }
}

pub fn client_connected() {
    if let Some(g) = CONNECTED_CLIENTS.get() {
        g.inc();
    }
}

pub fn client_disconnected() {
    if let Some(g) = CONNECTED_CLIENTS.get() {
        g.dec();
    }
}

/// Records command latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        record_command(&self.command, self.start.elapsed().as_secs_f64());
    }
}
