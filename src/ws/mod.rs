pub mod codec;
pub mod connection;
pub mod socket;

pub use connection::{ConnectionManager, ConnectionState, Transition};
pub use socket::{Connector, SocketEvent, SocketEventKind, SocketHandle, WsConnector};
