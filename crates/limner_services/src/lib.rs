//! Generation service adapters for the Limner pipeline.
//!
//! This crate implements the [`limner_interface`] contracts against real
//! providers: an OpenAI-compatible chat completions endpoint for the Summary
//! and Prompt stages, a Runware-style image inference endpoint, and a
//! Google-style text-to-speech endpoint. Every adapter folds its vendor's
//! response and error encodings into [`limner_core::GenerationOutcome`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chat;
mod classify;
mod image;
mod retry;
mod speech;

pub use chat::{ChatClient, ChatConfig, ChatConfigBuilder};
pub use image::{ImageClient, ImageConfig, ImageConfigBuilder};
pub use retry::{DEFAULT_MAX_RETRIES, with_backoff};
pub use speech::{SpeechClient, SpeechConfig, SpeechConfigBuilder};
