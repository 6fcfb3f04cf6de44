//! Core data types for the Limner book enrichment pipeline.
//!
//! This crate provides the Book/Chapter/Chunk data model, the deterministic
//! chunker and its tokenizer contract, and the outcome type shared by every
//! generation service adapter.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod book;
mod chunker;
mod outcome;
mod request;
mod state;
mod tokenizer;

pub use book::{Book, Chapter, Chunk, ChunkKey, SummaryContext};
pub use chunker::{Chunker, normalize_text};
pub use outcome::GenerationOutcome;
pub use request::{ChatRequest, ImageArtifact};
pub use state::{BookState, ChunkState};
pub use tokenizer::{CoreBpeTokenizer, TokenUsage, Tokenizer};
