pub mod comment;
pub mod error;
pub mod media;
pub mod messages;
pub mod participant;
pub mod room;

pub use comment::*;
pub use error::*;
pub use media::*;
pub use messages::*;
pub use participant::*;
pub use room::*;
