mod item;
mod storage;
mod store;

pub use item::{new_history_id, HistoryItem};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, DEFAULT_STORAGE_QUOTA_BYTES};
pub use store::{HistoryStore, HISTORY_STORAGE_KEY};
