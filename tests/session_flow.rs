use std::sync::{Arc, Mutex};
use std::time::Duration;

use room_sync::services::{ActiveRoom, RoomSession, SessionTimings};
use room_sync::ws::{ConnectionState, Connector, SocketEvent, SocketEventKind, SocketHandle};
use room_sync::SyncError;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time;

struct MockSocket {
    generation: u64,
    events: mpsc::UnboundedSender<SocketEvent>,
    outgoing: mpsc::UnboundedReceiver<String>,
}

/// In-memory connector: records every opened socket and lets the test play
/// the server side of it
#[derive(Clone, Default)]
struct MockConnector {
    sockets: Arc<Mutex<Vec<MockSocket>>>,
}

impl Connector for MockConnector {
    fn open(&self, _url: &str, generation: u64, events: mpsc::UnboundedSender<SocketEvent>) -> SocketHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sockets.lock().unwrap().push(MockSocket {
            generation,
            events,
            outgoing: rx,
        });
        SocketHandle::new(generation, tx)
    }
}

impl MockConnector {
    fn opened(&self) -> usize {
        self.sockets.lock().unwrap().len()
    }

    fn emit(&self, socket: usize, kind: SocketEventKind) {
        let sockets = self.sockets.lock().unwrap();
        let s = &sockets[socket];
        s.events
            .send(SocketEvent {
                generation: s.generation,
                kind,
            })
            .unwrap();
    }

    fn server_sends(&self, socket: usize, msg: Value) {
        self.emit(socket, SocketEventKind::Frame(msg.to_string()));
    }

    /// Frames the client wrote on `socket` since the last call
    fn take_sent(&self, socket: usize) -> Vec<Value> {
        let mut sockets = self.sockets.lock().unwrap();
        let mut sent = Vec::new();
        while let Ok(frame) = sockets[socket].outgoing.try_recv() {
            sent.push(serde_json::from_str(&frame).unwrap());
        }
        sent
    }

    fn writer_dropped(&self, socket: usize) -> bool {
        let mut sockets = self.sockets.lock().unwrap();
        matches!(
            sockets[socket].outgoing.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        )
    }
}

fn start(connector: &MockConnector) -> ActiveRoom {
    RoomSession::start(
        "ROOM1",
        "ws://mock/o/socket",
        SessionTimings::default(),
        Arc::new(connector.clone()),
    )
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn open_room(connector: &MockConnector) -> ActiveRoom {
    let room = start(connector);
    settle().await;
    connector.emit(0, SocketEventKind::Opened);
    settle().await;
    connector.take_sent(0);
    room
}

fn of_type<'a>(frames: &'a [Value], kind: &str) -> Vec<&'a Value> {
    frames.iter().filter(|f| f["type"] == kind).collect()
}

#[tokio::test(start_paused = true)]
async fn joins_with_generated_identity_on_open() {
    let connector = MockConnector::default();
    let room = start(&connector);
    settle().await;
    assert_eq!(connector.opened(), 1);
    assert!(connector.take_sent(0).is_empty());

    connector.emit(0, SocketEventKind::Opened);
    settle().await;

    let sent = connector.take_sent(0);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["type"], "join-room");
    assert_eq!(sent[0]["code"], "ROOM1");
    assert!(sent[0]["user"]["id"].as_str().unwrap().starts_with("user_"));
    assert_eq!(sent[0]["user"]["isTyping"], false);

    let view = room.handle.view();
    let identity = view.identity.borrow().clone().expect("identity");
    assert_eq!(sent[0]["user"]["id"], identity.id.as_str());
    assert_eq!(sent[0]["user"]["name"], identity.display_name.as_str());
    assert_eq!(view.link.borrow().state, ConnectionState::Open);

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_collapse_into_one_text_update() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;

    for content in ["h", "he", "hel", "hell", "hello"] {
        room.handle.send_edit(content).unwrap();
        time::sleep(Duration::from_millis(30)).await;
        assert!(of_type(&connector.take_sent(0), "text-update").is_empty());
    }
    time::sleep(Duration::from_millis(80)).await;

    let sent = connector.take_sent(0);
    let updates = of_type(&sent, "text-update");
    assert_eq!(updates.len(), 1);
    assert_eq!(*updates[0], json!({"type": "text-update", "code": "ROOM1", "content": "hello"}));

    room.handle.send_edit("hello!").unwrap();
    time::sleep(Duration::from_millis(150)).await;
    let sent = connector.take_sent(0);
    assert_eq!(of_type(&sent, "text-update")[0]["content"], "hello!");

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn reconnects_one_second_after_error() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;
    let view = room.handle.view();

    connector.emit(0, SocketEventKind::Error("connection reset".into()));
    connector.emit(0, SocketEventKind::Closed);
    settle().await;
    assert!(view.link.borrow().reconnecting);
    assert_eq!(view.link.borrow().state, ConnectionState::Closed);

    time::sleep(Duration::from_millis(990)).await;
    assert_eq!(connector.opened(), 1);

    time::sleep(Duration::from_millis(20)).await;
    assert_eq!(connector.opened(), 2);
    assert_eq!(view.link.borrow().state, ConnectionState::Connecting);

    // Same identity is reused on the new socket
    let first_id = view.identity.borrow().clone().unwrap().id;
    connector.emit(1, SocketEventKind::Opened);
    settle().await;
    let sent = connector.take_sent(1);
    assert_eq!(sent[0]["type"], "join-room");
    assert_eq!(sent[0]["user"]["id"], first_id.as_str());

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn failed_connects_keep_retrying() {
    let connector = MockConnector::default();
    let room = start(&connector);
    settle().await;

    for attempt in 0..3 {
        connector.emit(attempt, SocketEventKind::Error("refused".into()));
        connector.emit(attempt, SocketEventKind::Closed);
        settle().await;
        time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(connector.opened(), attempt + 2);
    }

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn retry_is_skipped_when_socket_was_replaced() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;

    connector.emit(0, SocketEventKind::Error("boom".into()));
    connector.emit(0, SocketEventKind::Closed);
    settle().await;

    // Reconnect on demand before the retry fires
    room.handle.send_edit("typed during outage").unwrap();
    settle().await;
    assert_eq!(connector.opened(), 2);

    time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(connector.opened(), 2);

    // Late events of the old socket are ignored
    connector.emit(1, SocketEventKind::Opened);
    settle().await;
    connector.server_sends(0, json!({"type": "text-update", "code": "ROOM1", "content": "stale"}));
    settle().await;
    assert_eq!(room.handle.view().document.borrow().content, "typed during outage");

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn connection_lost_shows_only_after_grace_window() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;
    let view = room.handle.view();

    connector.emit(0, SocketEventKind::Closed);
    settle().await;
    time::sleep(Duration::from_millis(700)).await;
    assert!(!view.link.borrow().connection_lost);

    time::sleep(Duration::from_millis(150)).await;
    assert!(view.link.borrow().connection_lost);

    room.handle.send_edit("back").unwrap();
    settle().await;
    connector.emit(1, SocketEventKind::Opened);
    settle().await;
    assert!(!view.link.borrow().connection_lost);
    assert_eq!(view.link.borrow().state, ConnectionState::Open);

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn fast_reconnect_never_flags_connection_lost() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;
    let link = room.handle.view().link;

    connector.emit(0, SocketEventKind::Closed);
    settle().await;
    time::sleep(Duration::from_millis(300)).await;
    room.handle.send_edit("x").unwrap();
    settle().await;
    connector.emit(1, SocketEventKind::Opened);
    settle().await;

    time::sleep(Duration::from_secs(2)).await;
    assert!(!link.borrow().connection_lost);

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn heartbeat_pings_every_thirty_seconds() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;
    let me = room.handle.view().identity.borrow().clone().unwrap();

    time::sleep(Duration::from_millis(29_990)).await;
    assert!(connector.take_sent(0).is_empty());

    time::sleep(Duration::from_millis(20)).await;
    let sent = connector.take_sent(0);
    assert_eq!(sent[0], json!({"type": "ping", "code": "ROOM1"}));
    assert_eq!(
        sent[1],
        json!({"type": "user-activity", "code": "ROOM1", "userId": me.id, "isTyping": false})
    );

    // Pong is liveness only
    connector.server_sends(0, json!({"type": "pong", "code": "ROOM1"}));
    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(of_type(&connector.take_sent(0), "ping").len(), 1);

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn comment_is_added_and_deleted_through_server_echo() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;
    let view = room.handle.view();
    let me = view.identity.borrow().clone().unwrap();

    room.handle.add_comment("nice", Some(5), None).unwrap();
    settle().await;
    let sent = connector.take_sent(0);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["type"], "comment-add");
    assert_eq!(sent[0]["comment"]["id"], "");
    assert_eq!(sent[0]["comment"]["lineNumber"], 5);
    assert_eq!(sent[0]["comment"]["content"], "nice");
    assert_eq!(sent[0]["comment"]["authorId"], me.id.as_str());
    // Not applied until the server echoes it
    assert!(view.comments.borrow().is_empty());

    connector.server_sends(
        0,
        json!({"type": "comment-add", "code": "ROOM1", "comment": {
            "id": "c1", "lineNumber": 5, "author": me.display_name, "authorId": me.id,
            "content": "nice", "timestamp": "2024-05-01T10:00:00Z"
        }}),
    );
    settle().await;
    {
        let comments = view.comments.borrow();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, "c1");
        assert_eq!(comments[0].line_number, Some(5));
        assert_eq!(comments[0].content, "nice");
    }

    room.handle.delete_comment("c1").unwrap();
    settle().await;
    let sent = connector.take_sent(0);
    assert_eq!(sent[0]["type"], "comment-delete");
    assert_eq!(sent[0]["comment"]["id"], "c1");

    connector.server_sends(0, json!({"type": "comment-delete", "code": "ROOM1", "comment": {"id": "c1"}}));
    settle().await;
    assert!(view.comments.borrow().is_empty());

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn users_sync_replaces_roster_after_stale_join() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;
    let view = room.handle.view();

    let user = |id: &str| json!({"id": id, "name": id, "color": "#2ecc71", "lastSeen": "2024-05-01T10:00:00Z"});
    connector.server_sends(0, json!({"type": "user-joined", "code": "ROOM1", "user": user("C")}));
    connector.server_sends(0, json!({"type": "users-sync", "code": "ROOM1", "users": [user("A"), user("B")]}));
    connector.server_sends(
        0,
        json!({"type": "user-activity", "code": "ROOM1", "userId": "ghost", "isTyping": true}),
    );
    settle().await;

    let ids: Vec<String> = view.participants.borrow().iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec!["A", "B"]);

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn own_echo_does_not_touch_document() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;
    let mut document = room.handle.view().document;

    room.handle.send_edit("hello").unwrap();
    time::sleep(Duration::from_millis(150)).await;
    assert_eq!(document.borrow_and_update().content, "hello");

    connector.server_sends(0, json!({"type": "text-update", "code": "ROOM1", "content": "hello"}));
    settle().await;
    assert!(!document.has_changed().unwrap());

    connector.server_sends(0, json!({"type": "text-update", "code": "ROOM1", "content": "hello there"}));
    settle().await;
    assert!(document.has_changed().unwrap());
    assert_eq!(document.borrow_and_update().content, "hello there");

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_are_dropped_without_closing() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;
    let view = room.handle.view();

    connector.emit(0, SocketEventKind::Frame("{not json".into()));
    connector.server_sends(0, json!({"type": "cursor-move", "code": "ROOM1"}));
    connector.server_sends(0, json!({"type": "initial-content", "code": "ROOM1", "content": "from server"}));
    connector.server_sends(0, json!({"type": "media-sync", "code": "ROOM1", "mediaFiles": null}));
    settle().await;

    assert_eq!(view.document.borrow().content, "from server");
    assert!(view.media.borrow().is_empty());
    assert_eq!(view.link.borrow().state, ConnectionState::Open);
    assert!(!connector.writer_dropped(0));
    assert_eq!(connector.opened(), 1);

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn discrete_actions_are_noops_while_disconnected() {
    let connector = MockConnector::default();
    let room = start(&connector);
    settle().await;

    // Still connecting
    room.handle.add_comment("early", None, None).unwrap();
    room.handle.report_activity(true, Some(1)).unwrap();
    room.handle.send_edit("draft").unwrap();
    settle().await;
    assert_eq!(connector.opened(), 1);

    connector.emit(0, SocketEventKind::Opened);
    settle().await;
    let sent = connector.take_sent(0);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["type"], "join-room");

    connector.emit(0, SocketEventKind::Closed);
    settle().await;
    room.handle.delete_comment("c1").unwrap();
    room.handle.report_activity(false, None).unwrap();
    settle().await;
    assert_eq!(connector.opened(), 1);
    assert!(connector.take_sent(0).is_empty());

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn pending_edit_is_dropped_when_socket_closes() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;

    room.handle.send_edit("unsent").unwrap();
    settle().await;
    connector.emit(0, SocketEventKind::Closed);
    time::sleep(Duration::from_millis(200)).await;

    assert!(connector.take_sent(0).is_empty());
    assert_eq!(connector.opened(), 1);

    room.leave().await;
}

#[tokio::test(start_paused = true)]
async fn leave_releases_socket_and_stops_session() {
    let connector = MockConnector::default();
    let room = open_room(&connector).await;
    let handle = room.handle.clone();
    let view = handle.view();

    handle.send_edit("pending").unwrap();
    settle().await;
    room.leave().await;

    assert!(of_type(&connector.take_sent(0), "text-update").is_empty());
    assert!(connector.writer_dropped(0));
    assert!(matches!(handle.send_edit("late"), Err(SyncError::SessionClosed)));
    assert!(matches!(view.link.borrow().state, ConnectionState::Closing));

    // Nothing fires after teardown
    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.opened(), 1);
}
