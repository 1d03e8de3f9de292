//! Socket lifecycle for one room.
//!
//! Every socket the manager opens gets a fresh generation number. Events are
//! tagged with the generation of the socket that emitted them and anything
//! that does not match the current generation is dropped, so a superseded
//! socket can never touch room state.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::SyncError;
use crate::ws::socket::{Connector, SocketEvent, SocketEventKind, SocketHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Outcome of a current-generation socket event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Frame(String),
    /// The socket of `generation` failed; a retry may be scheduled for it
    Errored { generation: u64 },
    Closed,
}

pub struct ConnectionManager {
    url: String,
    connector: Arc<dyn Connector>,
    events: mpsc::UnboundedSender<SocketEvent>,
    socket: Option<SocketHandle>,
    generation: u64,
    state: ConnectionState,
    room_code: Option<String>,
}

impl ConnectionManager {
    pub fn new(
        url: impl Into<String>,
        connector: Arc<dyn Connector>,
        events: mpsc::UnboundedSender<SocketEvent>,
    ) -> Self {
        Self {
            url: url.into(),
            connector,
            events,
            socket: None,
            generation: 0,
            state: ConnectionState::Idle,
            room_code: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn room_code(&self) -> Option<&str> {
        self.room_code.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open && self.socket.is_some()
    }

    pub fn has_socket(&self) -> bool {
        self.socket.is_some()
    }

    /// Open a socket for `room_code`, replacing any socket still referenced
    pub fn connect(&mut self, room_code: &str) {
        if self.is_open() && self.room_code.as_deref() == Some(room_code) {
            debug!("Socket #{} already open for room {}", self.generation, room_code);
            return;
        }

        if let Some(stale) = self.socket.take() {
            info!("Force-closing stale socket #{} before reconnecting", stale.generation());
            stale.close();
        }

        self.generation += 1;
        self.room_code = Some(room_code.to_string());
        self.state = ConnectionState::Connecting;
        info!("Connecting socket #{} for room {} to {}", self.generation, room_code, self.url);
        self.socket = Some(self.connector.open(&self.url, self.generation, self.events.clone()));
    }

    /// Apply a socket event. Returns `None` for events of superseded sockets.
    pub fn handle_event(&mut self, event: SocketEvent) -> Option<Transition> {
        if event.generation != self.generation {
            debug!(
                "Ignoring {:?} from stale socket #{} (current #{})",
                event.kind, event.generation, self.generation
            );
            return None;
        }

        match event.kind {
            SocketEventKind::Opened => {
                if self.state == ConnectionState::Closing {
                    // Closed by us while still connecting
                    return None;
                }
                self.state = ConnectionState::Open;
                info!("Socket #{} open", event.generation);
                Some(Transition::Opened)
            }
            SocketEventKind::Frame(frame) => Some(Transition::Frame(frame)),
            SocketEventKind::Error(reason) => {
                warn!("Socket #{} error: {}", event.generation, reason);
                Some(Transition::Errored { generation: event.generation })
            }
            SocketEventKind::Closed => {
                self.state = ConnectionState::Closed;
                // Closed is the socket's last event, nothing else can race the release
                self.socket = None;
                info!("Socket #{} closed", event.generation);
                Some(Transition::Closed)
            }
        }
    }

    /// True while a retry scheduled for `generation` is still meaningful
    pub fn should_retry(&self, generation: u64) -> bool {
        self.generation == generation && self.room_code.is_some()
    }

    pub fn send(&self, frame: String) -> Result<(), SyncError> {
        match &self.socket {
            Some(socket) if self.state == ConnectionState::Open => socket.send(frame),
            _ => Err(SyncError::NotConnected),
        }
    }

    /// Leave the room: drop the socket and forget the room code
    pub fn close(&mut self) {
        self.room_code = None;
        if let Some(socket) = self.socket.take() {
            self.state = ConnectionState::Closing;
            socket.close();
        } else {
            self.state = ConnectionState::Closed;
        }
    }
}
