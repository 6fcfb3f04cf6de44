//! Error types for the Limner book enrichment pipeline.
//!
//! This crate provides the foundation error types used throughout the Limner
//! workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error
//! handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use limner_error::{LimnerResult, ConfigError};
//!
//! fn load_credentials() -> LimnerResult<String> {
//!     Err(ConfigError::new("GROQ_API_KEY not set"))?
//! }
//!
//! match load_credentials() {
//!     Ok(key) => println!("Got: {}", key),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chunker;
mod config;
mod error;
mod json;
mod pipeline;
mod service;
mod storage;

pub use chunker::ChunkerError;
pub use config::ConfigError;
pub use error::{LimnerError, LimnerErrorKind, LimnerResult};
pub use json::JsonError;
pub use pipeline::{PipelineError, PipelineErrorKind};
pub use service::{RetryableError, ServiceError, ServiceErrorKind};
pub use storage::{StorageError, StorageErrorKind};
