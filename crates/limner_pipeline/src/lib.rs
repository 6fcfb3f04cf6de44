//! Stage loops and orchestration for the Limner book enrichment pipeline.
//!
//! Four stages sweep the same shared [`limner_core::Book`] concurrently:
//!
//! - **Summary** walks chunks strictly in order, feeding each request the
//!   immediately preceding chunk's resulting summary and character/place
//!   knowledge (the rolling context).
//! - **Prompt** turns a summarized chunk's text and knowledge base into an
//!   image-generation prompt.
//! - **Image** renders each prompt and stores the bytes.
//! - **Audio** narrates each summary and stores the bytes.
//!
//! Stages never call each other; each re-polls chunk readiness on every
//! sweep, so a chunk whose prerequisite isn't met yet is simply skipped and
//! revisited. Malformed generations go through the bounded
//! validation-repair sub-protocol in [`repair`]; transient service failures
//! are retried inside the service adapters. Every mutation is mirrored to
//! the recovery store before the stage moves on.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod audio;
mod config;
mod image;
mod orchestrator;
mod prompt;
mod repair;
mod schema;
mod stage;
mod summary;

pub mod prompts;

pub use audio::AudioStage;
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use image::ImageStage;
pub use orchestrator::{Orchestrator, PipelineReport};
pub use prompt::PromptStage;
pub use repair::{MAX_VALIDATION_ERROR_TRY, repair};
pub use schema::{PromptResponse, StageSchema, SummaryResponse};
pub use stage::{StageGate, StageReport};
pub use summary::SummaryStage;
