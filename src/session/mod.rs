//! Per-connection IRC session.
//!
//! A `Session` is the state machine behind one client connection:
//!
//! ```text
//! Unauthenticated -> Authenticating (PASS/NICK/USER partially set)
//!                 -> Connected (welcome sent, remote login, long poll running)
//! ```
//!
//! It owns the remote [`Snapshot`] for the connection. Client commands go
//! through the [`Registry`]; poll batches go through [`Session::apply_batch`].
//! Both only queue outgoing lines, which the connection task drains with
//! [`Session::take_output`].

mod channel;
mod connection;
pub mod helpers;
mod messaging;
mod registry;

#[cfg(test)]
mod tests;

pub use registry::{Handler, Registry};

use sbirc_proto::{Command, Message, Prefix, Response};
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::HandlerError;
use crate::remote::{ChatBackend, PollBatch};
use crate::state::{ChannelKey, MembershipEvent, Reconciler, RoomId, Snapshot, UserId};
use crate::translate::{self, Inbound};
use helpers::{from_user, server_notice, server_reply};

/// Per-process settings every session reads.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_name: String,
    pub network: String,
    pub topic: String,
    pub default_room: Option<RoomId>,
    pub self_user_id: Option<UserId>,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            server_name: config.server.name.clone(),
            network: config.server.network.clone(),
            topic: config.remote.topic.clone(),
            default_room: config.remote.default_room.map(RoomId),
            self_user_id: config.remote.self_user_id.map(UserId),
        }
    }
}

/// IRC session state for one client.
pub struct Session {
    settings: Arc<Settings>,
    backend: Arc<dyn ChatBackend>,
    nick: String,
    password: String,
    realname: String,
    connected: bool,
    joined: BTreeSet<ChannelKey>,
    pending_joins: Vec<String>,
    snapshot: Snapshot,
    reconciler: Reconciler,
    events: mpsc::Sender<PollBatch>,
    shutdown: broadcast::Sender<()>,
    poller: Option<JoinHandle<()>>,
    outbox: Vec<Message>,
}

impl Session {
    /// `events` is the channel the long poll delivers batches into.
    pub fn new(
        settings: Arc<Settings>,
        backend: Arc<dyn ChatBackend>,
        events: mpsc::Sender<PollBatch>,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            settings,
            backend,
            nick: String::new(),
            password: String::new(),
            realname: String::new(),
            connected: false,
            joined: BTreeSet::new(),
            pending_joins: Vec::new(),
            snapshot: Snapshot::new(),
            reconciler: Reconciler::new(),
            events,
            shutdown,
            poller: None,
            outbox: Vec::new(),
        }
    }

    pub fn nick_or_star(&self) -> &str {
        if self.nick.is_empty() { "*" } else { &self.nick }
    }

    /// Drain the lines queued for the client.
    pub fn take_output(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }

    fn send(&mut self, msg: Message) {
        self.outbox.push(msg);
    }

    /// Numeric reply addressed to the client's nick.
    fn reply(&mut self, response: Response, mut params: Vec<String>) {
        params.insert(0, self.nick_or_star().to_string());
        let msg = server_reply(&self.settings.server_name, response, params);
        self.send(msg);
    }

    fn notice(&mut self, text: impl Into<String>) {
        let msg = server_notice(&self.settings.server_name, self.nick_or_star(), text);
        self.send(msg);
    }

    /// Report something the operator should see: a NOTICE once connected,
    /// a log line before that.
    fn diagnostic(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!(nick = %self.nick_or_star(), "{}", text);
        if self.connected {
            self.notice(text);
        }
    }

    /// Turn a handler error into a numeric, or a diagnostic when it has none.
    fn report(&mut self, err: HandlerError, cmd_name: &str) {
        match err.to_irc_reply(&self.settings.server_name, self.nick_or_star(), cmd_name) {
            Some(reply) => self.send(reply),
            None => self.diagnostic(format!("{cmd_name} failed: {err}")),
        }
    }

    fn own_id(&self) -> Option<UserId> {
        translate::resolve_self(&self.snapshot, self.settings.self_user_id, &self.nick)
    }

    fn self_prefix(&self) -> Prefix {
        translate::self_prefix(
            &self.snapshot,
            self.own_id(),
            &self.nick,
            &self.settings.server_name,
        )
    }

    /// Process one client message.
    ///
    /// Breaks with the quit reason when the client asked to leave.
    pub async fn handle_message(
        &mut self,
        registry: &Registry,
        msg: &Message,
    ) -> ControlFlow<Option<String>> {
        match registry.dispatch(self, msg).await {
            Ok(()) => ControlFlow::Continue(()),
            Err(HandlerError::Quit(reason)) => ControlFlow::Break(reason),
            Err(e) => {
                self.report(e, &msg.command_name());
                ControlFlow::Continue(())
            }
        }
    }

    /// Fold a poll batch into the snapshot and emit everything the client
    /// needs to see: membership changes, auto-joins, then messages.
    pub fn apply_batch(&mut self, batch: PollBatch) {
        self.snapshot.apply(&batch);
        debug!(cursor = ?self.snapshot.last_id(), messages = batch.messages.len(), "Applied batch");

        if let Some(rec) = self.reconciler.update(&self.snapshot, &mut self.joined) {
            for event in rec.events {
                self.emit_membership(event);
            }
            self.pending_joins
                .extend(rec.new_channels.iter().map(ChannelKey::to_string));
            channel::settle_pending_joins(self);
        }

        let own = self.own_id();
        for msg in &batch.messages {
            let inbound = translate::remote_to_irc(
                msg,
                &self.snapshot,
                own,
                self.nick_or_star(),
                &self.settings.server_name,
            );
            match inbound {
                Inbound::Lines(lines) => {
                    crate::metrics::record_relay("to_irc");
                    self.outbox.extend(lines);
                }
                Inbound::Suppressed => {}
                Inbound::Diagnostic(text) => self.diagnostic(text),
            }
        }
    }

    fn emit_membership(&mut self, event: MembershipEvent) {
        let server = self.settings.server_name.clone();
        let msg = match event {
            MembershipEvent::SelfPart(key) => {
                from_user(self.self_prefix(), Command::PART(key.to_string(), None))
            }
            MembershipEvent::MemberJoin { channel, user } => from_user(
                translate::author_prefix(&self.snapshot, user, &server),
                Command::JOIN(channel.to_string(), None),
            ),
            MembershipEvent::MemberMode {
                channel,
                user,
                mode,
            } => {
                let Some(username) = self.snapshot.user(user).map(|u| u.username.clone()) else {
                    return;
                };
                Message::from(Command::MODE(
                    channel.to_string(),
                    vec![mode.to_string(), username],
                ))
                .with_prefix(Prefix::ServerName(server))
            }
            MembershipEvent::MemberPart { channel, user } => from_user(
                translate::author_prefix(&self.snapshot, user, &server),
                Command::PART(channel.to_string(), None),
            ),
        };
        self.send(msg);
    }

    /// Log in to the remote and start the long poll.
    ///
    /// A failed login is reported to the client; the connection stays up
    /// without a poll loop.
    async fn start_remote(&mut self) {
        let backend = Arc::clone(&self.backend);
        if let Err(e) = backend.login(&self.nick, &self.password).await {
            warn!(nick = %self.nick, error = %e, "Remote login failed");
            self.notice(format!("Login failed: {e}"));
            return;
        }

        match backend.connect(self.events.clone(), self.shutdown.subscribe()) {
            Ok(handle) => {
                info!(nick = %self.nick, "Remote session started");
                self.poller = Some(handle);
            }
            Err(e) => self.diagnostic(format!("Failed to start remote listener: {e}")),
        }
    }

    /// Stop the long poll, if one is running.
    pub fn shutdown(&mut self) {
        let _ = self.shutdown.send(());
        self.poller = None;
    }
}
