//! One active room: connection, reconciliation, coalescing and timers driven
//! from a single task.
//!
//! The UI talks to the session through a [`SessionHandle`] and reads state
//! through the [`RoomView`] receivers. Socket events, timer fires and UI
//! commands are all serialized through the session's `select!` loop, so no
//! state here is ever touched concurrently.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::identity::Identity;
use crate::models::{
    ClientMessage, Comment, CommentMessage, ContentMessage, JoinRoomMessage, RoomMessage, SyncError,
    UserActivityMessage,
};
use crate::reconcile::{ReconciliationEngine, RoomView, Store};
use crate::services::coalescer::{EditCoalescer, PendingEdit};
use crate::utils::Deadline;
use crate::ws::codec;
use crate::ws::{ConnectionManager, ConnectionState, Connector, SocketEvent, Transition};

/// Timer settings of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
    pub edit_debounce: Duration,
    pub disconnect_grace: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(1),
            edit_debounce: Duration::from_millis(100),
            disconnect_grace: Duration::from_millis(800),
        }
    }
}

/// Connection indicator for presentation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: ConnectionState,
    /// A reconnect attempt is scheduled
    pub reconnecting: bool,
    /// Disconnected for longer than the grace window
    pub connection_lost: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Edit(String),
    AddComment {
        content: String,
        line_number: Option<u32>,
        line_range: Option<String>,
    },
    DeleteComment(String),
    ReportActivity {
        is_typing: bool,
        current_line: Option<u32>,
    },
    Leave,
}

/// Cloneable command side of a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    room_code: String,
    commands: mpsc::UnboundedSender<SessionCommand>,
    view: RoomView,
}

impl SessionHandle {
    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    /// Fresh receivers for every store of the room
    pub fn view(&self) -> RoomView {
        self.view.clone()
    }

    /// Apply a local edit. Reconnects on demand when the socket is down.
    pub fn send_edit(&self, content: impl Into<String>) -> Result<(), SyncError> {
        self.send(SessionCommand::Edit(content.into()))
    }

    pub fn add_comment(
        &self,
        content: impl Into<String>,
        line_number: Option<u32>,
        line_range: Option<String>,
    ) -> Result<(), SyncError> {
        self.send(SessionCommand::AddComment {
            content: content.into(),
            line_number,
            line_range,
        })
    }

    pub fn delete_comment(&self, id: impl Into<String>) -> Result<(), SyncError> {
        self.send(SessionCommand::DeleteComment(id.into()))
    }

    pub fn report_activity(&self, is_typing: bool, current_line: Option<u32>) -> Result<(), SyncError> {
        self.send(SessionCommand::ReportActivity { is_typing, current_line })
    }

    fn send(&self, command: SessionCommand) -> Result<(), SyncError> {
        self.commands.send(command).map_err(|_| SyncError::SessionClosed)
    }
}

/// A started session and the task running it
#[derive(Debug)]
pub struct ActiveRoom {
    pub handle: SessionHandle,
    task: JoinHandle<()>,
}

impl ActiveRoom {
    /// Tear the session down and wait until it released its socket
    pub async fn leave(self) {
        if self.handle.send(SessionCommand::Leave).is_err() {
            debug!("Session for room {} already stopped", self.handle.room_code);
        }
        if let Err(e) = self.task.await {
            error!("Session task for room {} failed: {}", self.handle.room_code, e);
        }
    }
}

pub struct RoomSession {
    room_code: String,
    timings: SessionTimings,
    connection: ConnectionManager,
    socket_events: mpsc::UnboundedReceiver<SocketEvent>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    engine: ReconciliationEngine,
    link: Store<LinkStatus>,
    identity: Store<Option<Identity>>,
    coalescer: EditCoalescer,
    heartbeat: Deadline,
    reconnect: Deadline,
    retry_generation: Option<u64>,
    grace: Deadline,
    connection_lost: bool,
}

impl RoomSession {
    /// Spawn a session for `room_code` on the current runtime
    pub fn start(
        room_code: impl Into<String>,
        url: impl Into<String>,
        timings: SessionTimings,
        connector: Arc<dyn Connector>,
    ) -> ActiveRoom {
        let room_code = room_code.into();
        let (events_tx, socket_events) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::unbounded_channel();

        let session = RoomSession {
            room_code: room_code.clone(),
            timings,
            connection: ConnectionManager::new(url, connector, events_tx),
            socket_events,
            commands,
            engine: ReconciliationEngine::new(),
            link: Store::default(),
            identity: Store::default(),
            coalescer: EditCoalescer::new(timings.edit_debounce),
            heartbeat: Deadline::new(),
            reconnect: Deadline::new(),
            retry_generation: None,
            grace: Deadline::new(),
            connection_lost: false,
        };

        let view = session
            .engine
            .view(session.link.subscribe(), session.identity.subscribe());
        let handle = SessionHandle {
            room_code,
            commands: commands_tx,
            view,
        };

        let task = tokio::spawn(session.run());
        ActiveRoom { handle, task }
    }

    async fn run(mut self) {
        info!("Entering room {}", self.room_code);
        self.connection.connect(&self.room_code);
        self.publish_link();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Leave) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = self.socket_events.recv() => self.handle_socket_event(event),
                Some(edit) = self.coalescer.due() => self.send_pending_edit(edit),
                _ = self.heartbeat.fired() => self.on_heartbeat(),
                _ = self.reconnect.fired() => self.on_retry(),
                _ = self.grace.fired() => self.on_grace_elapsed(),
            }
            self.publish_link();
        }

        self.teardown();
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Edit(content) => self.on_local_edit(content),
            SessionCommand::AddComment {
                content,
                line_number,
                line_range,
            } => {
                let Some(identity) = self.joined_identity("add comment") else {
                    return;
                };
                let comment = Comment {
                    id: String::new(),
                    line_number,
                    line_range,
                    author: identity.display_name,
                    author_id: identity.id,
                    content,
                    created_at: Utc::now(),
                };
                self.send(ClientMessage::CommentAdd(CommentMessage {
                    code: self.room_code.clone(),
                    comment,
                }));
            }
            SessionCommand::DeleteComment(id) => {
                if self.joined_identity("delete comment").is_none() {
                    return;
                }
                self.send(ClientMessage::CommentDelete(CommentMessage {
                    code: self.room_code.clone(),
                    comment: Comment::reference(id),
                }));
            }
            SessionCommand::ReportActivity {
                is_typing,
                current_line,
            } => {
                let Some(identity) = self.joined_identity("report activity") else {
                    return;
                };
                self.send(ClientMessage::UserActivity(UserActivityMessage {
                    code: self.room_code.clone(),
                    user_id: identity.id,
                    is_typing,
                    current_line,
                }));
            }
            // Handled by the loop
            SessionCommand::Leave => {}
        }
    }

    fn on_local_edit(&mut self, content: String) {
        self.engine.apply_local_edit(&content);

        if self.connection.is_open() {
            self.coalescer.push(&self.room_code, &content);
            return;
        }

        self.coalescer.cancel();
        if self.connection.state() == ConnectionState::Connecting {
            debug!("Edit while connecting to room {}, not sent", self.room_code);
        } else {
            info!("Edit while disconnected, reconnecting to room {}", self.room_code);
            self.connection.connect(&self.room_code);
        }
    }

    fn send_pending_edit(&mut self, edit: PendingEdit) {
        if !self.connection.is_open() {
            debug!("Dropping coalesced edit for room {}, socket not open", edit.room_code);
            return;
        }
        self.send(ClientMessage::TextUpdate(ContentMessage {
            code: edit.room_code,
            content: edit.content,
        }));
    }

    fn handle_socket_event(&mut self, event: SocketEvent) {
        let Some(transition) = self.connection.handle_event(event) else {
            return;
        };

        match transition {
            Transition::Opened => self.on_open(),
            Transition::Frame(frame) => match codec::decode(&frame) {
                Ok(msg) => {
                    self.engine.apply(msg, Utc::now());
                }
                Err(e) => warn!("Dropping frame in room {}: {}", self.room_code, e),
            },
            Transition::Errored { generation } => self.schedule_retry(generation),
            Transition::Closed => self.on_close(),
        }
    }

    fn on_open(&mut self) {
        let existing = self.identity.get().clone();
        let identity = match existing {
            Some(identity) => identity,
            None => {
                let identity = Identity::generate();
                info!("Joining as {} ({})", identity.display_name, identity.id);
                self.identity.set(Some(identity.clone()));
                identity
            }
        };

        self.send(ClientMessage::JoinRoom(JoinRoomMessage {
            code: self.room_code.clone(),
            user: identity.to_participant(Utc::now()),
        }));

        self.heartbeat.arm(self.timings.heartbeat_interval);
        self.grace.cancel();
        if self.connection_lost {
            info!("Connection to room {} restored", self.room_code);
            self.connection_lost = false;
        }
    }

    fn on_close(&mut self) {
        self.heartbeat.cancel();
        self.coalescer.cancel();
        if !self.connection_lost && !self.grace.is_armed() {
            self.grace.arm(self.timings.disconnect_grace);
        }
    }

    fn schedule_retry(&mut self, generation: u64) {
        if self.connection.room_code().is_none() {
            return;
        }
        info!(
            "Reconnect for room {} scheduled in {:?}",
            self.room_code, self.timings.reconnect_delay
        );
        self.retry_generation = Some(generation);
        self.reconnect.arm(self.timings.reconnect_delay);
    }

    fn on_retry(&mut self) {
        let Some(generation) = self.retry_generation.take() else {
            return;
        };
        if self.connection.should_retry(generation) {
            info!("Reconnecting to room {}", self.room_code);
            self.connection.connect(&self.room_code);
        } else {
            info!(
                "Skipping reconnect, socket #{} was already replaced by #{}",
                generation,
                self.connection.generation()
            );
        }
    }

    fn on_heartbeat(&mut self) {
        let Some(identity) = self.joined_identity("heartbeat") else {
            return;
        };
        self.send(ClientMessage::Ping(RoomMessage {
            code: self.room_code.clone(),
        }));
        self.send(ClientMessage::UserActivity(UserActivityMessage {
            code: self.room_code.clone(),
            user_id: identity.id,
            is_typing: false,
            current_line: None,
        }));
        self.heartbeat.arm(self.timings.heartbeat_interval);
    }

    fn on_grace_elapsed(&mut self) {
        if !self.connection.is_open() {
            warn!("Connection to room {} lost", self.room_code);
            self.connection_lost = true;
        }
    }

    /// The local identity, if the socket is open and the join went out
    fn joined_identity(&self, action: &str) -> Option<Identity> {
        if !self.connection.is_open() {
            debug!("Skipping {} for room {}, not connected", action, self.room_code);
            return None;
        }
        self.identity.get().clone()
    }

    fn send(&self, msg: ClientMessage) {
        let frame = match codec::encode(&msg) {
            Ok(frame) => frame,
            Err(e) => {
                error!("{}", e);
                return;
            }
        };
        if let Err(e) = self.connection.send(frame) {
            warn!("Failed to send to room {}: {}", self.room_code, e);
        }
    }

    fn publish_link(&self) {
        self.link.set(LinkStatus {
            state: self.connection.state(),
            reconnecting: self.reconnect.is_armed(),
            connection_lost: self.connection_lost,
        });
    }

    fn teardown(&mut self) {
        self.coalescer.cancel();
        self.heartbeat.cancel();
        self.reconnect.cancel();
        self.retry_generation = None;
        self.grace.cancel();
        self.connection.close();
        self.publish_link();
        info!("Left room {}", self.room_code);
    }
}
