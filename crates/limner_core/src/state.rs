//! Durable mirror records for books and chunks.
//!
//! These are the persisted recovery format: one record per chunk plus one
//! book-level record, each fully rewritten after every mutation. A restarted
//! process reloads them and resumes by skipping already-set fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Persisted mirror of a single chunk's stage-owned fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChunkState {
    /// Chapter-scoped ordinal, 1-based.
    pub chunk_id: u32,
    /// Owning chapter's ordinal, 0-based.
    pub chapter_id: u32,
    /// Rolling narrative summary (Summary stage).
    pub summary: String,
    /// Character name → visual description (Summary stage).
    pub characters: BTreeMap<String, String>,
    /// Place name → visual description (Summary stage).
    pub places: BTreeMap<String, String>,
    /// Scene title (Prompt stage).
    pub scene_title: String,
    /// Image-generation prompt (Prompt stage).
    pub prompt: String,
    /// Reference to the stored generated image (Image stage).
    pub image: String,
    /// Provider task id for the image generation (Image stage).
    pub image_task: String,
    /// Whether narrated audio has been generated and stored (Audio stage).
    pub audio: bool,
    /// Whether the summary context was inherited from the preceding chunk
    /// instead of generated for this chunk.
    pub inherited: bool,
    /// Whether all four stage fields are set.
    pub is_done: bool,
}

impl ChunkState {
    /// Stable storage key for this chunk: `{chapter_id:04}_{chunk_id:04}`.
    pub fn key(&self) -> String {
        format!("{:04}_{:04}", self.chapter_id, self.chunk_id)
    }
}

/// Persisted book-level record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookState {
    /// Stable book identity.
    pub book_id: Uuid,
    /// Chunk keys in sweep order (chapter order, then chunk order).
    pub chunk_keys: Vec<String>,
    /// Whether every chunk is done.
    pub is_done: bool,
}
