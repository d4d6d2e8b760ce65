use super::*;
use crate::error::RemoteError;
use crate::remote::{MessageKind, RemoteMessage, RoomUpdate};
use crate::state::{Rank, RemoteUser};
use async_trait::async_trait;
use parking_lot::Mutex;

#[derive(Default)]
struct FakeBackend {
    fail_login: bool,
    fail_send: bool,
    logins: Mutex<Vec<(String, String)>>,
    sent: Mutex<Vec<(RoomId, String)>>,
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn login(&self, username: &str, password: &str) -> Result<(), RemoteError> {
        self.logins
            .lock()
            .push((username.to_string(), password.to_string()));
        if self.fail_login {
            return Err(RemoteError::Auth("bad credentials".into()));
        }
        Ok(())
    }

    fn connect(
        &self,
        _events: mpsc::Sender<PollBatch>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, RemoteError> {
        Ok(tokio::spawn(async move {
            let _ = shutdown.recv().await;
        }))
    }

    async fn send_message(&self, room: RoomId, text: &str) -> Result<(), RemoteError> {
        if self.fail_send {
            return Err(RemoteError::Status {
                endpoint: "Comment",
                status: 500,
            });
        }
        self.sent.lock().push((room, text.to_string()));
        Ok(())
    }
}

struct Harness {
    session: Session,
    backend: Arc<FakeBackend>,
    registry: Registry,
    _events: mpsc::Receiver<PollBatch>,
}

impl Harness {
    fn new(backend: FakeBackend) -> Self {
        let settings = Arc::new(Settings {
            server_name: "smilebasic".into(),
            network: "SmileBASICSource".into(),
            topic: "https://smilebasicsource.com/chat".into(),
            default_room: Some(RoomId(384)),
            self_user_id: None,
        });
        let backend = Arc::new(backend);
        let (tx, rx) = mpsc::channel(8);
        let session = Session::new(settings, backend.clone(), tx);
        Self {
            session,
            backend,
            registry: Registry::new(),
            _events: rx,
        }
    }

    async fn send(&mut self, line: &str) -> ControlFlow<Option<String>> {
        let msg: Message = line.parse().expect("test line parses");
        self.session.handle_message(&self.registry, &msg).await
    }

    fn output(&mut self) -> Vec<String> {
        self.session
            .take_output()
            .iter()
            .map(|m| m.to_string().trim_end().to_string())
            .collect()
    }

    async fn register(&mut self) {
        self.send("PASS pw").await;
        self.send("NICK alice").await;
        self.send("USER alice 0 * :Alice Example").await;
        self.output();
    }
}

fn user(id: u64, name: &str, rank: Rank) -> RemoteUser {
    RemoteUser {
        id: UserId(id),
        username: name.into(),
        rank,
    }
}

fn room(id: u64) -> RoomUpdate {
    RoomUpdate {
        id: RoomId(id),
        deleted: false,
    }
}

/// alice (1), bob (2, voice) and carol (3, op) in room 5.
fn batch_with_members(members: &[u64]) -> PollBatch {
    PollBatch {
        users: vec![
            user(1, "alice", Rank::Member),
            user(2, "bob", Rank::Voice),
            user(3, "carol", Rank::Operator),
        ],
        rooms: vec![room(5)],
        listeners: vec![(RoomId(5), members.iter().copied().map(UserId).collect())],
        ..PollBatch::default()
    }
}

fn chat(author: u64, text: &str) -> RemoteMessage {
    RemoteMessage {
        id: 50,
        room: RoomId(5),
        author: UserId(author),
        meta: None,
        text: text.into(),
        kind: MessageKind::Chat,
    }
}

fn count_numeric(lines: &[String], code: &str) -> usize {
    lines
        .iter()
        .filter(|l| l.split(' ').nth(1) == Some(code))
        .count()
}

#[tokio::test]
async fn registration_sends_one_welcome_then_logs_in() {
    let mut h = Harness::new(FakeBackend::default());
    h.send("PASS pw").await;
    h.send("NICK alice").await;
    assert!(h.output().is_empty());
    assert!(!h.session.connected);

    h.send("USER alice 0 * :Alice Example").await;
    let out = h.output();
    assert_eq!(count_numeric(&out, "001"), 1);
    assert_eq!(
        out[1],
        ":smilebasic 005 alice CHANTYPES=# PREFIX=(ov)@+ NETWORK=SmileBASICSource :are supported by this server"
    );
    assert_eq!(out[2], ":smilebasic 422 alice :MOTD File is missing");
    assert_eq!(out.len(), 3);
    assert!(h.session.connected);
    assert!(h.session.poller.is_some());
    assert_eq!(
        *h.backend.logins.lock(),
        vec![("alice".to_string(), "pw".to_string())]
    );

    // repeated registration commands never re-send the welcome
    h.send("PASS other").await;
    h.send("NICK alice").await;
    let out = h.output();
    assert_eq!(count_numeric(&out, "001"), 0);
    assert_eq!(h.backend.logins.lock().len(), 1);
}

#[tokio::test]
async fn registration_order_does_not_matter() {
    let mut h = Harness::new(FakeBackend::default());
    h.send("USER alice 0 * :Alice").await;
    h.send("NICK alice").await;
    h.send("PASS pw").await;
    assert_eq!(count_numeric(&h.output(), "001"), 1);
}

#[tokio::test]
async fn login_failure_is_a_notice_and_connection_survives() {
    let mut h = Harness::new(FakeBackend {
        fail_login: true,
        ..FakeBackend::default()
    });
    h.send("PASS bad").await;
    h.send("NICK alice").await;
    h.send("USER alice 0 * :Alice").await;
    let out = h.output();
    let last = out.last().expect("notice sent");
    assert!(last.starts_with(":smilebasic NOTICE alice :Login failed:"), "{last}");
    assert!(h.session.poller.is_none());

    assert!(h.send("PING token").await.is_continue());
}

#[tokio::test]
async fn first_batch_auto_joins_every_room() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;

    h.session.apply_batch(batch_with_members(&[1, 2]));
    let out = h.output();
    assert_eq!(
        out,
        vec![
            ":alice!1@smilebasic JOIN #5",
            ":smilebasic 332 alice #5 https://smilebasicsource.com/chat",
            ":smilebasic 353 alice = #5 alice",
            ":smilebasic 353 alice = #5 +bob",
            ":smilebasic 366 alice #5 :End of /NAMES list",
        ]
    );
    assert!(h.session.joined.contains(&ChannelKey::new(RoomId(5))));
}

#[tokio::test]
async fn member_changes_become_join_mode_and_part() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.session.apply_batch(batch_with_members(&[1]));
    h.output();

    h.session.apply_batch(batch_with_members(&[1, 2, 3]));
    assert_eq!(
        h.output(),
        vec![
            ":bob!2@smilebasic JOIN #5",
            ":smilebasic MODE #5 +o bob",
            ":carol!3@smilebasic JOIN #5",
            ":smilebasic MODE #5 +o carol",
        ]
    );

    h.session.apply_batch(batch_with_members(&[1, 3]));
    assert_eq!(h.output(), vec![":bob!2@smilebasic PART #5"]);

    h.send("NAMES #5").await;
    let names = h.output();
    assert!(!names.iter().any(|l| l.ends_with("bob")));
    assert!(names.contains(&":smilebasic 353 alice = #5 @carol".to_string()));
}

#[tokio::test]
async fn plain_member_arrival_gets_voice() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    let mut first = batch_with_members(&[2]);
    first.users.push(user(4, "dave", Rank::Member));
    h.session.apply_batch(first);
    h.output();

    let mut second = batch_with_members(&[2, 4]);
    second.users.push(user(4, "dave", Rank::Member));
    h.session.apply_batch(second);
    assert_eq!(
        h.output(),
        vec![":dave!4@smilebasic JOIN #5", ":smilebasic MODE #5 +v dave"]
    );
}

#[tokio::test]
async fn reapplying_a_snapshot_is_silent() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.session.apply_batch(batch_with_members(&[1, 2]));
    h.output();

    h.session.apply_batch(batch_with_members(&[1, 2]));
    assert!(h.output().is_empty());
}

#[tokio::test]
async fn deleted_room_parts_the_client() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.session.apply_batch(batch_with_members(&[1, 2]));
    h.output();

    h.session.apply_batch(PollBatch {
        rooms: vec![RoomUpdate {
            id: RoomId(5),
            deleted: true,
        }],
        ..PollBatch::default()
    });
    assert_eq!(h.output(), vec![":alice!1@smilebasic PART #5"]);
    assert!(h.session.joined.is_empty());
}

#[tokio::test]
async fn join_unknown_channel_is_one_403() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.session.apply_batch(PollBatch {
        users: vec![user(1, "alice", Rank::Member)],
        rooms: vec![room(7)],
        ..PollBatch::default()
    });
    h.output();

    h.send("JOIN #5").await;
    let out = h.output();
    assert_eq!(out, vec![":smilebasic 403 alice #5 :No such channel"]);
    assert!(!out.iter().any(|l| l.contains(" JOIN ")));
}

#[tokio::test]
async fn joins_wait_for_the_first_snapshot() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.send("JOIN #5,#9").await;
    assert!(h.output().is_empty());

    h.session.apply_batch(batch_with_members(&[1]));
    let out = h.output();
    assert_eq!(count_numeric(&out, "403"), 1);
    assert!(out.contains(&":smilebasic 403 alice #9 :No such channel".to_string()));
    assert_eq!(out.iter().filter(|l| l.ends_with("JOIN #5")).count(), 1);
}

#[tokio::test]
async fn join_already_joined_is_silent() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.session.apply_batch(batch_with_members(&[1]));
    h.output();

    h.send("JOIN #5").await;
    assert!(h.output().is_empty());
}

#[tokio::test]
async fn part_and_rejoin() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.session.apply_batch(batch_with_members(&[1]));
    h.output();

    h.send("PART #5").await;
    assert_eq!(h.output(), vec![":alice!1@smilebasic PART #5"]);

    h.send("PART #5").await;
    assert_eq!(
        h.output(),
        vec![":smilebasic 442 alice #5 :You're not on that channel"]
    );

    h.send("JOIN #5").await;
    assert_eq!(count_numeric(&h.output(), "332"), 1);
}

#[tokio::test]
async fn who_lists_members_with_flags() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.session.apply_batch(batch_with_members(&[1, 2, 3]));
    h.output();

    h.send("WHO #5").await;
    assert_eq!(
        h.output(),
        vec![
            ":smilebasic 352 alice #5 1 smilebasic smilebasic alice G :0 alice",
            ":smilebasic 352 alice #5 2 smilebasic smilebasic bob G+ :0 bob",
            ":smilebasic 352 alice #5 3 smilebasic smilebasic carol G@ :0 carol",
            ":smilebasic 315 alice #5 :End of /WHO list.",
        ]
    );

    h.send("WHO #99").await;
    assert_eq!(h.output(), vec![":smilebasic 315 alice #99 :End of /WHO list."]);
}

#[tokio::test]
async fn names_for_unknown_channel_only_ends() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.session.apply_batch(batch_with_members(&[1]));
    h.output();

    h.send("NAMES #42").await;
    assert_eq!(
        h.output(),
        vec![":smilebasic 366 alice #42 :End of /NAMES list"]
    );
}

#[tokio::test]
async fn mode_query_reports_topic_lock() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;

    h.send("MODE #5").await;
    assert_eq!(h.output(), vec![":smilebasic 324 alice #5 +t"]);

    h.send("MODE alice +i").await;
    assert!(h.output().is_empty());

    h.send("MODE").await;
    assert_eq!(count_numeric(&h.output(), "461"), 1);
}

#[tokio::test]
async fn privmsg_to_channel_reaches_room() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.session.apply_batch(batch_with_members(&[1]));
    h.output();

    h.send("PRIVMSG #5 :hello world").await;
    h.send("PRIVMSG #5 :\x01ACTION waves\x01").await;
    assert_eq!(
        *h.backend.sent.lock(),
        vec![
            (RoomId(5), "hello world".to_string()),
            (RoomId(5), "/me waves".to_string()),
        ]
    );
    assert!(h.output().is_empty());
}

#[tokio::test]
async fn privmsg_to_user_goes_to_default_room() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.session.apply_batch(batch_with_members(&[1]));
    h.output();

    h.send("PRIVMSG bob :psst").await;
    assert_eq!(
        *h.backend.sent.lock(),
        vec![(RoomId(384), "/pm bob psst".to_string())]
    );
}

#[tokio::test]
async fn unrecognized_destination_is_a_diagnostic() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    h.session.apply_batch(batch_with_members(&[1]));
    h.output();

    let flow = h.send("PRIVMSG nobody :hi").await;
    assert!(flow.is_continue());
    assert_eq!(
        h.output(),
        vec![":smilebasic NOTICE alice :Unrecognized destination: PRIVMSG nobody :hi"]
    );
    assert!(h.backend.sent.lock().is_empty());

    // NOTICE stays quiet towards the client but still reports
    h.send("NOTICE nobody :hi").await;
    assert_eq!(count_numeric(&h.output(), "401"), 0);
}

#[tokio::test]
async fn send_failure_is_a_diagnostic() {
    let mut h = Harness::new(FakeBackend {
        fail_send: true,
        ..FakeBackend::default()
    });
    h.register().await;
    h.session.apply_batch(batch_with_members(&[1]));
    h.output();

    h.send("PRIVMSG #5 :hello").await;
    let out = h.output();
    assert_eq!(out.len(), 1);
    assert_eq!(
        out[0],
        ":smilebasic NOTICE alice :PRIVMSG failed: remote: Comment returned status 500"
    );
}

#[tokio::test]
async fn inbound_chat_is_relayed_and_own_echo_dropped() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;
    let mut batch = batch_with_members(&[1, 2]);
    batch.messages = vec![chat(2, "hi alice"), chat(1, "my own words")];
    h.session.apply_batch(batch);

    let out = h.output();
    assert_eq!(out.last().map(String::as_str), Some(":bob!2@smilebasic PRIVMSG #5 :hi alice"));
    assert!(!out.iter().any(|l| l.contains("my own words")));
}

#[tokio::test]
async fn ping_pong_and_unknown_commands() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;

    h.send("PING abc123").await;
    assert_eq!(h.output(), vec![":smilebasic PONG smilebasic abc123"]);

    h.send("PONG smilebasic").await;
    h.send("KICK #5 bob").await;
    assert!(h.output().is_empty());
}

#[tokio::test]
async fn quit_ends_the_session() {
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;

    let flow = h.send("QUIT :bye").await;
    assert_eq!(flow, ControlFlow::Break(Some("bye".to_string())));
    assert_eq!(h.output(), vec!["ERROR :Closing link"]);

    h.session.shutdown();
    assert!(h.session.poller.is_none());
}

#[tokio::test]
async fn pre_registration_errors_are_numerics_addressed_to_star() {
    let mut h = Harness::new(FakeBackend::default());
    h.send("JOIN").await;
    assert_eq!(
        h.output(),
        vec![":smilebasic 461 * JOIN :Not enough parameters"]
    );
}

#[tokio::test]
async fn unknown_verbs_share_one_error_series() {
    crate::metrics::init();
    let mut h = Harness::new(FakeBackend::default());
    h.register().await;

    for verb in ["FOOBAR", "XYZZY", "KNOCKKNOCK", "QWERTYUIOP"] {
        assert_eq!(h.send(verb).await, ControlFlow::Continue(()));
    }
    assert!(h.output().is_empty());

    let metrics = crate::metrics::gather_metrics();
    let series: Vec<&str> = metrics
        .lines()
        .filter(|l| l.starts_with("sbirc_command_errors_total{"))
        .filter(|l| l.contains("error=\"unknown_command\""))
        .collect();
    assert_eq!(series.len(), 1, "{series:?}");
    assert!(series[0].contains("command=\"UNKNOWN\""));
    assert!(!metrics.contains("XYZZY"));
}
