use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Browser local storage allows roughly this much per origin.
pub const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Named UTF-8 slots, read and overwritten whole.
pub trait KeyValueStorage: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

fn check_quota(quota: Option<usize>, value: &str) -> Result<(), StorageError> {
    match quota {
        Some(quota) if value.len() > quota => Err(StorageError::QuotaExceeded {
            needed: value.len(),
            quota,
        }),
        _ => Ok(()),
    }
}

/// One `<key>.json` file per slot under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    quota: Option<usize>,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota: Some(DEFAULT_STORAGE_QUOTA_BYTES),
        }
    }

    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.quota = quota;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.slot_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota, value)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.slot_path(key), value)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            slots: BTreeMap::new(),
            quota: Some(quota),
        }
    }

    pub fn with_slot(mut self, key: &str, value: &str) -> Self {
        self.slots.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota, value)?;
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FileStorage, KeyValueStorage, MemoryStorage};

    #[test]
    fn file_storage_missing_slot_is_none() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let storage = FileStorage::new(temp.path());
        assert_eq!(storage.get("stylo-history")?, None);
        Ok(())
    }

    #[test]
    fn file_storage_overwrites_slot() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut storage = FileStorage::new(temp.path().join("nested"));
        storage.set("slot", "[1]")?;
        storage.set("slot", "[2]")?;
        assert_eq!(storage.get("slot")?.as_deref(), Some("[2]"));
        assert!(storage.slot_path("slot").ends_with("slot.json"));
        Ok(())
    }

    #[test]
    fn file_storage_rejects_values_over_quota() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut storage = FileStorage::new(temp.path()).with_quota(Some(4));
        storage.set("slot", "1234")?;
        let err = storage.set("slot", "12345").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(storage.get("slot")?.as_deref(), Some("1234"));
        Ok(())
    }

    #[test]
    fn memory_storage_quota() -> anyhow::Result<()> {
        let mut storage = MemoryStorage::with_quota(3);
        assert!(storage.set("k", "abcd").unwrap_err().is_quota_exceeded());
        storage.set("k", "abc")?;
        assert_eq!(storage.get("k")?.as_deref(), Some("abc"));
        Ok(())
    }
}
