pub mod config;
pub mod editor;
pub mod identity;
pub mod models;
pub mod reconcile;
pub mod services;
pub mod utils;
pub mod ws;

pub use models::SyncError;
