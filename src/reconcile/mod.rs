pub mod comments;
pub mod content;
pub mod engine;
pub mod media;
pub mod presence;
pub mod store;

pub use content::Document;
pub use engine::{ReconciliationEngine, RoomView};
pub use store::Store;
