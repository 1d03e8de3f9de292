use thiserror::Error;

/// Errors surfaced by the room sync engine
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to encode outbound message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed inbound frame: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("socket is not open")]
    NotConnected,

    #[error("socket transport error: {0}")]
    Transport(String),

    #[error("room session has shut down")]
    SessionClosed,

    #[error("invalid room code '{0}'")]
    InvalidRoomCode(String),
}
