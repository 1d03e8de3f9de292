use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::models::SyncError;

/// What happened on a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEventKind {
    Opened,
    Frame(String),
    Error(String),
    Closed,
}

/// A socket event tagged with the generation of the socket that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEvent {
    pub generation: u64,
    pub kind: SocketEventKind,
}

/// Write side of an opened socket.
///
/// Dropping the handle (or calling [`SocketHandle::close`]) closes the socket.
#[derive(Debug)]
pub struct SocketHandle {
    generation: u64,
    outgoing: mpsc::UnboundedSender<String>,
}

impl SocketHandle {
    pub fn new(generation: u64, outgoing: mpsc::UnboundedSender<String>) -> Self {
        Self { generation, outgoing }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn send(&self, frame: String) -> Result<(), SyncError> {
        self.outgoing
            .send(frame)
            .map_err(|_| SyncError::Transport(format!("socket #{} writer is gone", self.generation)))
    }

    pub fn close(self) {
        debug!("Closing socket #{}", self.generation);
    }
}

/// Opens sockets. Every event of the opened socket must be reported on
/// `events`, ending with exactly one [`SocketEventKind::Closed`].
pub trait Connector: Send + Sync {
    fn open(&self, url: &str, generation: u64, events: mpsc::UnboundedSender<SocketEvent>) -> SocketHandle;
}

/// Websocket connector backed by tokio-tungstenite
#[derive(Debug, Default, Clone)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, url: &str, generation: u64, events: mpsc::UnboundedSender<SocketEvent>) -> SocketHandle {
        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(run_socket(url.to_string(), generation, out_rx, events));
        SocketHandle::new(generation, out_tx)
    }
}

async fn run_socket(
    url: String,
    generation: u64,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    let emit = |kind: SocketEventKind| {
        // The session may already be gone, nobody to tell
        let _ = events.send(SocketEvent { generation, kind });
    };

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            warn!("Socket #{} failed to connect to {}: {}", generation, url, e);
            emit(SocketEventKind::Error(e.to_string()));
            emit(SocketEventKind::Closed);
            return;
        }
    };

    info!("Socket #{} connected to {}", generation, url);
    emit(SocketEventKind::Opened);

    let (mut writer, mut reader) = ws_stream.split();

    loop {
        tokio::select! {
            frame = outgoing.recv() => match frame {
                Some(text) => {
                    if let Err(e) = writer.send(Message::Text(text.into())).await {
                        warn!("Socket #{} write failed: {}", generation, e);
                        emit(SocketEventKind::Error(e.to_string()));
                        break;
                    }
                }
                // Handle dropped, close politely
                None => {
                    let _ = writer.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = reader.next() => match incoming {
                Some(Ok(Message::Text(text))) => emit(SocketEventKind::Frame(text.as_str().to_owned())),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!("Socket #{} read failed: {}", generation, e);
                    emit(SocketEventKind::Error(e.to_string()));
                    break;
                }
                // Binary frames and protocol pings carry nothing for us
                Some(Ok(_)) => {}
            },
        }
    }

    info!("Socket #{} closed", generation);
    emit(SocketEventKind::Closed);
}
