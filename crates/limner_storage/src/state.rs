//! Recovery-state persistence.

use limner_core::{BookState, ChunkState};
use limner_error::{LimnerResult, StorageError, StorageErrorKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const BOOK_FILE: &str = "book.json";

/// Persists the durable mirror of a book's generation state.
///
/// One file per chunk (`{chapter:04}_{chunk:04}.json`) plus `book.json`,
/// each fully rewritten via temp-file-then-rename after every mutation.
#[derive(Debug, Clone)]
pub struct StateStore {
    state_dir: PathBuf,
}

impl StateStore {
    /// Create a state store rooted at `state_dir`, creating the directory
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(state_dir: impl Into<PathBuf>) -> LimnerResult<Self> {
        let state_dir = state_dir.into();
        std::fs::create_dir_all(&state_dir).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                state_dir.display(),
                e
            )))
        })?;
        debug!(path = %state_dir.display(), "Initialized state store");
        Ok(Self { state_dir })
    }

    /// Directory this store writes into.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Persist the book-level record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    pub async fn save_book(&self, state: &BookState) -> LimnerResult<()> {
        let contents = serde_json::to_vec_pretty(state).map_err(|e| {
            StorageError::new(StorageErrorKind::StateEncoding(format!(
                "book record: {}",
                e
            )))
        })?;
        self.write_atomic(&self.state_dir.join(BOOK_FILE), &contents)
            .await
    }

    /// Load the book-level record, if one was persisted.
    ///
    /// # Errors
    ///
    /// Returns an error on IO failure or a corrupt record; a missing file
    /// is `Ok(None)`.
    pub async fn load_book(&self) -> LimnerResult<Option<BookState>> {
        let path = self.state_dir.join(BOOK_FILE);
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
                .into());
            }
        };
        let state = serde_json::from_slice(&contents).map_err(|e| {
            StorageError::new(StorageErrorKind::StateEncoding(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        Ok(Some(state))
    }

    /// Persist one chunk's record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    pub async fn save_chunk(&self, state: &ChunkState) -> LimnerResult<()> {
        let contents = serde_json::to_vec_pretty(state).map_err(|e| {
            StorageError::new(StorageErrorKind::StateEncoding(format!(
                "chunk {}: {}",
                state.key(),
                e
            )))
        })?;
        let path = self.state_dir.join(format!("{}.json", state.key()));
        self.write_atomic(&path, &contents).await?;
        debug!(chunk = %state.key(), "Saved chunk state");
        Ok(())
    }

    /// Load every persisted chunk record, keyed by chunk key.
    ///
    /// # Errors
    ///
    /// Returns an error on IO failure or a corrupt record.
    pub async fn load_chunks(&self) -> LimnerResult<HashMap<String, ChunkState>> {
        let mut entries = tokio::fs::read_dir(&self.state_dir).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                self.state_dir.display(),
                e
            )))
        })?;

        let mut states = HashMap::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                self.state_dir.display(),
                e
            )))
        })? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name == BOOK_FILE || !name.ends_with(".json") {
                continue;
            }
            let contents = tokio::fs::read(&path).await.map_err(|e| {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            })?;
            let state: ChunkState = serde_json::from_slice(&contents).map_err(|e| {
                StorageError::new(StorageErrorKind::StateEncoding(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            })?;
            states.insert(state.key(), state);
        }
        debug!(chunks = states.len(), "Loaded chunk states");
        Ok(states)
    }

    /// Write to a temp file first, then rename for atomicity.
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> LimnerResult<()> {
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, contents).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp_path, path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;
        Ok(())
    }
}
