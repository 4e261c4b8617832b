use serde_json::Value;

use super::item::HistoryItem;
use super::storage::KeyValueStorage;
use crate::error::StorageError;

pub const HISTORY_STORAGE_KEY: &str = "stylo-history";

/// Newest-first list of past generations backed by a single storage slot.
///
/// Every mutation rewrites the whole slot. A failed write leaves the
/// in-memory list as mutated; the error goes back to the caller.
pub struct HistoryStore {
    storage: Box<dyn KeyValueStorage>,
    items: Vec<HistoryItem>,
    selected_id: Option<String>,
    load_error: Option<String>,
}

impl HistoryStore {
    pub fn load(storage: impl KeyValueStorage + 'static) -> Self {
        Self::load_boxed(Box::new(storage))
    }

    /// Best-effort read: an absent, unreadable or non-array slot yields an
    /// empty list, and array rows that do not parse are skipped. Anything
    /// other than an absent slot or a clean parse is kept in
    /// [`HistoryStore::load_error`].
    pub fn load_boxed(storage: Box<dyn KeyValueStorage>) -> Self {
        let (items, load_error) = match storage.get(HISTORY_STORAGE_KEY) {
            Ok(Some(raw)) => parse_history_items(&raw),
            Ok(None) => (Vec::new(), None),
            Err(err) => (Vec::new(), Some(format!("Failed to load history: {err}"))),
        };
        Self {
            storage,
            items,
            selected_id: None,
            load_error,
        }
    }

    /// Why the last load fell back to fewer items than stored, if it did.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn selected(&self) -> Option<&HistoryItem> {
        self.selected_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn clear_selection(&mut self) {
        self.selected_id = None;
    }

    pub fn storage(&self) -> &dyn KeyValueStorage {
        self.storage.as_ref()
    }

    pub fn persist(&mut self) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&self.items)?;
        self.storage.set(HISTORY_STORAGE_KEY, &raw)
    }

    /// Prepends `item`. An older entry with the same id is dropped first so
    /// ids stay unique.
    pub fn insert(&mut self, item: HistoryItem) -> Result<(), StorageError> {
        self.items.retain(|existing| existing.id != item.id);
        self.items.insert(0, item);
        self.persist()
    }

    /// Returns whether an entry was removed. Nothing is written when `id` is
    /// unknown.
    pub fn remove(&mut self, id: &str) -> Result<bool, StorageError> {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            return Ok(false);
        }
        if self.selected_id.as_deref() == Some(id) {
            self.selected_id = None;
        }
        self.persist()?;
        Ok(true)
    }

    /// Empties the list once `confirm` (given the current item count) agrees.
    pub fn clear(&mut self, confirm: impl FnOnce(usize) -> bool) -> Result<bool, StorageError> {
        if !confirm(self.items.len()) {
            return Ok(false);
        }
        self.items.clear();
        self.selected_id = None;
        self.persist()?;
        Ok(true)
    }

    pub fn select(&mut self, id: &str) -> Option<&HistoryItem> {
        let found = self.items.iter().find(|item| item.id == id)?;
        self.selected_id = Some(found.id.clone());
        Some(found)
    }
}

fn parse_history_items(raw: &str) -> (Vec<HistoryItem>, Option<String>) {
    let rows = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(rows)) => rows,
        Ok(_) => {
            return (
                Vec::new(),
                Some("Failed to load history: stored value is not a list".to_string()),
            )
        }
        Err(err) => return (Vec::new(), Some(format!("Failed to load history: {err}"))),
    };
    let mut items: Vec<HistoryItem> = Vec::new();
    let mut skipped = 0usize;
    for row in rows {
        let Ok(item) = serde_json::from_value::<HistoryItem>(row) else {
            skipped += 1;
            continue;
        };
        if items.iter().any(|existing| existing.id == item.id) {
            continue;
        }
        items.push(item);
    }
    let load_error = (skipped > 0)
        .then(|| format!("Failed to load history: skipped {skipped} unreadable item(s)"));
    (items, load_error)
}
