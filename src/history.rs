//! Client-side history of generated images.
//!
//! The list is read once when [History::load] runs and written back in full
//! after every change. Most recent first, capped at [HISTORY_LIMIT].

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::constants::{HISTORY_FILE_NAME, HISTORY_LIMIT};
use crate::models::GenerationResult;

/// Raw key/value storage for the serialized history.
pub trait HistoryStore {
    /// The stored value, if any.
    fn get(&self) -> Option<String>;
    /// Replaces the stored value.
    fn set(&self, value: &str) -> std::io::Result<()>;
    /// Removes the stored value.
    fn clear(&self) -> std::io::Result<()>;
}

/// Keeps the history in memory only.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    value: Mutex<Option<String>>,
}

impl HistoryStore for MemoryHistoryStore {
    fn get(&self) -> Option<String> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, value: &str) -> std::io::Result<()> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Keeps the history in a JSON file.
#[derive(Clone, Debug)]
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.promptmint/history.json`, or the working directory without a home.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".promptmint")
            .join(HISTORY_FILE_NAME)
    }
}

impl HistoryStore for FileHistoryStore {
    fn get(&self) -> Option<String> {
        std::fs::read_to_string(&self.path).ok()
    }

    fn set(&self, value: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, value)
    }

    fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// The capped list of past generations.
#[derive(Debug)]
pub struct History<S: HistoryStore> {
    store: S,
    entries: Vec<GenerationResult>,
}

impl<S: HistoryStore> History<S> {
    /// Reads the stored list. Missing or unreadable data loads as empty.
    pub fn load(store: S) -> Self {
        let mut entries: Vec<GenerationResult> = match store.get() {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("Ignoring unreadable history: {err}");
                Vec::new()
            }),
            None => Vec::new(),
        };
        entries.truncate(HISTORY_LIMIT);
        Self { store, entries }
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> &[GenerationResult] {
        &self.entries
    }

    /// One entry by position.
    pub fn get(&self, index: usize) -> Option<&GenerationResult> {
        self.entries.get(index)
    }

    /// Puts `result` at the front, dropping the oldest past the cap.
    pub fn record(&mut self, result: GenerationResult) -> std::io::Result<()> {
        self.entries.insert(0, result);
        self.entries.truncate(HISTORY_LIMIT);
        self.persist()
    }

    /// Records the token id an entry was minted as.
    pub fn set_token_id(&mut self, index: usize, token_id: u64) -> std::io::Result<bool> {
        let Some(entry) = self.entries.get_mut(index) else {
            return Ok(false);
        };
        entry.token_id = Some(token_id);
        self.persist()?;
        Ok(true)
    }

    /// Deletes one entry.
    pub fn remove(&mut self, index: usize) -> std::io::Result<Option<GenerationResult>> {
        if index >= self.entries.len() {
            return Ok(None);
        }
        let removed = self.entries.remove(index);
        self.persist()?;
        Ok(Some(removed))
    }

    /// Deletes everything.
    pub fn clear(&mut self) -> std::io::Result<()> {
        self.entries.clear();
        self.store.clear()
    }

    fn persist(&self) -> std::io::Result<()> {
        let raw = serde_json::to_string(&self.entries).map_err(std::io::Error::other)?;
        self.store.set(&raw)
    }
}
