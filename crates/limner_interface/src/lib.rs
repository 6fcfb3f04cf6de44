//! Generation service contracts consumed by the Limner pipeline.
//!
//! Each external capability — chat-style text generation, image generation,
//! speech synthesis — sits behind one narrow trait returning
//! [`GenerationOutcome`], so the stage loops never see vendor-specific
//! response or error encodings.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use limner_core::{ChatRequest, GenerationOutcome, ImageArtifact};

/// Chat-style text generation used by the Summary and Prompt stages.
///
/// A successful outcome carries the raw model payload (expected to be JSON);
/// parsing and schema validation are the caller's concern because failures
/// there feed the validation-repair sub-protocol.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given request.
    async fn generate(&self, req: &ChatRequest) -> GenerationOutcome<String>;

    /// Provider name (e.g. "groq").
    fn provider_name(&self) -> &'static str;

    /// Model identifier.
    fn model_name(&self) -> &str;
}

/// Image generation used by the Image stage.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image for the given positive prompt.
    async fn generate_image(&self, prompt: &str) -> GenerationOutcome<ImageArtifact>;

    /// Fetch the generated image's bytes from the provider-hosted URL.
    async fn download(&self, url: &str) -> GenerationOutcome<Vec<u8>>;

    /// Provider name (e.g. "runware").
    fn provider_name(&self) -> &'static str;
}

/// Text-to-speech synthesis used by the Audio stage.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize narration audio for the given text.
    async fn synthesize(&self, text: &str) -> GenerationOutcome<Vec<u8>>;

    /// Provider name (e.g. "google-tts").
    fn provider_name(&self) -> &'static str;
}
