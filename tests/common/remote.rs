//! Fake remote chat API for the integration tests.
//!
//! Same fake as `src/remote/testing.rs`, plus listen-body builders.
//! `Read/listen` blocks until a reply is queued, like the real long poll.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// What the next `Read/listen` call answers with.
pub enum ListenReply {
    Body(Value),
    Status(u16),
}

#[derive(Default)]
struct Inner {
    logins: Mutex<Vec<(String, String)>>,
    comments: Mutex<Vec<Value>>,
    listen_actions: Mutex<Vec<Value>>,
    listen_queue: Mutex<VecDeque<ListenReply>>,
    listen_ready: Notify,
}

#[derive(Clone)]
pub struct FakeApi {
    inner: Arc<Inner>,
    base_url: String,
}

impl FakeApi {
    pub async fn start() -> Self {
        let inner = Arc::new(Inner::default());
        let app = Router::new()
            .route("/User/authenticate", post(authenticate))
            .route("/Read/chain", get(chain))
            .route("/Read/listen", get(listen))
            .route("/Comment", post(comment))
            .with_state(Arc::clone(&inner));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake api");
        let addr = listener.local_addr().expect("fake api address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            inner,
            base_url: format!("http://{addr}/"),
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    /// Queue the body of the next `Read/listen` response.
    pub fn push_listen(&self, body: Value) {
        self.push_reply(ListenReply::Body(body));
    }

    pub fn push_reply(&self, reply: ListenReply) {
        self.inner.listen_queue.lock().push_back(reply);
        self.inner.listen_ready.notify_waiters();
    }

    pub fn logins(&self) -> Vec<(String, String)> {
        self.inner.logins.lock().clone()
    }

    pub fn comments(&self) -> Vec<Value> {
        self.inner.comments.lock().clone()
    }

    /// Decoded `actions` parameter of every `Read/listen` call so far.
    pub fn listen_actions(&self) -> Vec<Value> {
        self.inner.listen_actions.lock().clone()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer tok-"))
}

async fn authenticate(State(inner): State<Arc<Inner>>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    inner.logins.lock().push((username.clone(), password.clone()));
    if password == "wrong" {
        return (StatusCode::UNAUTHORIZED, "bad credentials").into_response();
    }
    // the real API answers with a JSON string
    Json(format!("tok-{username}")).into_response()
}

async fn chain() -> Json<Value> {
    Json(json!({
        "comment": [{ "id": 100, "parentId": 5, "createUserId": 1, "content": "old" }],
        "user": [],
        "content": [],
    }))
}

async fn listen(
    State(inner): State<Arc<Inner>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let actions = query
        .get("actions")
        .and_then(|a| serde_json::from_str(a).ok())
        .unwrap_or(Value::Null);
    inner.listen_actions.lock().push(actions);

    loop {
        let notified = inner.listen_ready.notified();
        let next = inner.listen_queue.lock().pop_front();
        if let Some(reply) = next {
            return match reply {
                ListenReply::Body(body) => Json(body).into_response(),
                ListenReply::Status(code) => StatusCode::from_u16(code)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                    .into_response(),
            };
        }
        notified.await;
    }
}

async fn comment(
    State(inner): State<Arc<Inner>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    inner.comments.lock().push(body);
    StatusCode::OK
}

impl FakeApi {
    /// Wait until at least `n` comments were posted.
    pub async fn wait_for_comments(&self, n: usize) -> Vec<Value> {
        for _ in 0..100 {
            let comments = self.comments();
            if comments.len() >= n {
                return comments;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.comments()
    }
}

/// A listen body with alice (1) and bob (2, voice) in room 5.
pub fn room_with_members(members: &[u64], last_id: u64) -> Value {
    json!({
        "lastId": last_id,
        "chains": {
            "user": [
                { "id": 1, "username": "alice", "super": false },
                { "id": 2, "username": "bob", "super": true }
            ],
            "content": [{ "id": 5, "deleted": false }],
            "comment": []
        },
        "listeners": { "5": members }
    })
}

/// A listen body carrying one chat comment in room 5.
pub fn chat_comment(id: u64, author: u64, text: &str) -> Value {
    json!({
        "lastId": id,
        "chains": {
            "user": [],
            "content": [],
            "comment": [{
                "id": id,
                "parentId": 5,
                "createUserId": author,
                "content": format!("{{\"m\":\"12y\"}}\n{text}")
            }]
        }
    })
}
