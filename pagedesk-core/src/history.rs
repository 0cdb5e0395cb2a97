use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::warn;

/// Last-viewed page per ever-opened file, keyed by absolute path.
pub type HistoryMap = HashMap<PathBuf, usize>;

/// History is best-effort: loading never fails (a missing or corrupt record
/// yields an empty mapping), saving rewrites the whole mapping atomically.
pub trait HistoryStore {
    fn load(&self) -> HistoryMap;
    fn save(&self, history: &HistoryMap) -> Result<()>;
}

pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create history directory at {parent:?}"))?;
        }
        Ok(Self { path })
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> HistoryMap {
        if !self.path.exists() {
            return HistoryMap::new();
        }
        let payload = match fs::read_to_string(&self.path) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(?err, path = ?self.path, "failed to read history file");
                return HistoryMap::new();
            }
        };
        match serde_json::from_str(&payload) {
            Ok(history) => history,
            Err(err) => {
                warn!(?err, path = ?self.path, "discarding corrupt history file");
                HistoryMap::new()
            }
        }
    }

    fn save(&self, history: &HistoryMap) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let payload = serde_json::to_string_pretty(history)?;
        let mut file = File::create(&tmp)
            .with_context(|| format!("failed to open temp history file {tmp:?}"))?;
        file.write_all(payload.as_bytes())?;
        file.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

pub struct MemoryHistoryStore {
    inner: Mutex<HistoryMap>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HistoryMap::new()),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> HistoryMap {
        self.inner.lock().clone()
    }

    fn save(&self, history: &HistoryMap) -> Result<()> {
        *self.inner.lock() = history.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_the_mapping() {
        let dir = tempdir().unwrap();
        let store = FileHistoryStore::new(dir.path().join("state").join("history.json")).unwrap();

        let mut history = HistoryMap::new();
        history.insert(PathBuf::from("/books/manual.pdf"), 42);
        history.insert(PathBuf::from("/books/paper.pdf"), 0);
        store.save(&history).unwrap();

        assert_eq!(store.load(), history);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = FileHistoryStore::new(dir.path().join("history.json")).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileHistoryStore::new(path).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_overwrites_wholesale() {
        let dir = tempdir().unwrap();
        let store = FileHistoryStore::new(dir.path().join("history.json")).unwrap();

        let mut first = HistoryMap::new();
        first.insert(PathBuf::from("/a.pdf"), 3);
        store.save(&first).unwrap();

        let mut second = HistoryMap::new();
        second.insert(PathBuf::from("/b.pdf"), 7);
        store.save(&second).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(&PathBuf::from("/b.pdf")), Some(&7));
    }
}
