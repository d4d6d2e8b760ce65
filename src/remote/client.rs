//! HTTP client for the remote chat API.

use parking_lot::RwLock;
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{Chains, ListenResponse};
use crate::error::RemoteError;
use crate::state::RoomId;

/// Chains requested on every listen call.
///
/// Room members are not requested; the remote includes `listeners` in every
/// listen reply on its own.
const LISTEN_CHAINS: [&str; 3] = ["comment.0id", "user.1createUserId", "content.1parentId"];

/// Markup metadata line prepended to every outgoing comment.
pub fn message_preamble() -> String {
    json!({ "m": "12y" }).to_string()
}

/// Thin client over the remote REST endpoints.
///
/// Cloning is cheap and clones share the bearer token.
#[derive(Clone)]
pub struct SbsClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl SbsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sbirc/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self) -> Result<String, RemoteError> {
        self.token.read().clone().ok_or(RemoteError::NotAuthenticated)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// `POST User/authenticate`. The response body is the bearer token.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<(), RemoteError> {
        let resp = self
            .http
            .post(self.url("User/authenticate"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(RemoteError::Auth(format!("{}: {}", status.as_u16(), body.trim())));
        }

        let token = body.trim().trim_matches('"').to_string();
        if token.is_empty() {
            return Err(RemoteError::Auth("empty token".to_string()));
        }
        *self.token.write() = Some(token);
        info!(username = %username, "Authenticated with remote");
        Ok(())
    }

    /// Fetch the id of the newest comment, the starting cursor for listening.
    pub async fn latest_comment_id(&self) -> Result<Option<u64>, RemoteError> {
        let comment = json!({ "reverse": true, "limit": 1 }).to_string();
        let resp = self
            .http
            .get(self.url("Read/chain"))
            .query(&[
                ("requests", format!("comment-{comment}")),
                ("requests", "user.0createUserId".to_string()),
                ("requests", "content.0parentId".to_string()),
            ])
            .send()
            .await?;
        check_status("Read/chain", resp.status())?;

        let chains: Chains = serde_json::from_slice(&resp.bytes().await?)?;
        Ok(chains.comment.first().map(|c| c.id))
    }

    /// One long-poll round trip. Blocks until the remote has news.
    pub async fn listen(&self, last_id: Option<u64>) -> Result<ListenResponse, RemoteError> {
        let token = self.token()?;
        let actions = json!({ "lastId": last_id, "chains": LISTEN_CHAINS }).to_string();
        let resp = self
            .http
            .get(self.url("Read/listen"))
            .query(&[("actions", actions)])
            .bearer_auth(token)
            .send()
            .await?;
        check_status("Read/listen", resp.status())?;

        let body: ListenResponse = serde_json::from_slice(&resp.bytes().await?)?;
        debug!(last_id = ?body.last_id, "Listen returned");
        Ok(body)
    }

    /// `POST Comment` into a room.
    pub async fn post_comment(&self, room: RoomId, text: &str) -> Result<(), RemoteError> {
        let token = self.token()?;
        let resp = self
            .http
            .post(self.url("Comment"))
            .bearer_auth(token)
            .json(&json!({
                "parentId": room.0,
                "content": format!("{}\n{}", message_preamble(), text),
            }))
            .send()
            .await?;
        check_status("Comment", resp.status())
    }
}

fn check_status(endpoint: &'static str, status: StatusCode) -> Result<(), RemoteError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(RemoteError::Status {
            endpoint,
            status: status.as_u16(),
        })
    }
}
