pub mod coalescer;
pub mod room_session;

pub use coalescer::{EditCoalescer, PendingEdit};
pub use room_session::{ActiveRoom, LinkStatus, RoomSession, SessionCommand, SessionHandle, SessionTimings};
