pub mod chat;
pub mod error;
pub mod events;
pub mod history;
pub mod images;
pub mod models;
pub mod options;

pub use error::{StorageError, StudioError};
