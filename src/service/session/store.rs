use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use snafu::{ResultExt, Snafu};

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum StoreError {
    #[snafu(display("cannot read `{}`: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot write `{}`: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("`{}` is not a valid store file: {source}", path.display()))]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("cannot encode value for key `{key}`: {source}"))]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

/// A persistent string key-value store, scoped to one local profile.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: String) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Keeps every key in a single JSON object on disk. The file is rewritten on each change.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(error) => return Err(error).context(ReadSnafu { path: &self.path }),
        };

        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&text).context(CorruptSnafu { path: &self.path })
    }

    /// Entries to build the next write on. A corrupt file is replaced rather than kept.
    fn read_for_write(&self) -> Result<(BTreeMap<String, String>, bool)> {
        match self.read() {
            Ok(entries) => Ok((entries, false)),
            Err(error @ StoreError::Corrupt { .. }) => {
                tracing::warn!(%error, "discarding corrupt store file");
                Ok((BTreeMap::new(), true))
            }
            Err(error) => Err(error),
        }
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context(WriteSnafu { path: parent })?;
        }

        let text = serde_json::to_string_pretty(entries).context(EncodeSnafu { key: "*" })?;
        std::fs::write(&self.path, text).context(WriteSnafu { path: &self.path })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.read()?;
        Ok(entries.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let (mut entries, _) = self.read_for_write()?;
        entries.insert(key.to_string(), value);
        self.write(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let (mut entries, corrupt) = self.read_for_write()?;

        if entries.remove(key).is_some() || corrupt {
            self.write(&entries)?;
        }

        Ok(())
    }
}

/// Volatile store, for tests and for running without a profile file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.json");

        let store = FileStore::new(&path);
        store.set("a", "1".to_string()).unwrap();
        store.set("b", "2".to_string()).unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));

        assert_eq!(store.get("a").unwrap(), None);
        store.remove("a").unwrap();
        assert!(!store.path().exists(), "removing from an empty store writes nothing");
    }

    #[test]
    fn file_store_remove_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("profile.json"));

        store.set("a", "1".to_string()).unwrap();
        store.set("b", "2".to_string()).unwrap();
        store.remove("a").unwrap();

        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, "not json").unwrap();

        let error = FileStore::new(&path).get("a").unwrap_err();
        assert!(matches!(error, StoreError::Corrupt { .. }));
    }

    #[test]
    fn file_store_set_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let store = FileStore::new(&path);
        store.set("a", "1".to_string()).unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn file_store_remove_clears_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        store.remove("a").unwrap();

        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn memory_store_get_set_remove() {
        let store = MemoryStore::new();

        store.set("a", "1".to_string()).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }
}
