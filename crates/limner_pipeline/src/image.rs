//! Image stage: render each prompt and store the bytes.

use crate::config::PipelineConfig;
use crate::stage::{StageGate, StageReport, SweepTally};
use limner_core::{Book, Chunk, GenerationOutcome};
use limner_error::LimnerResult;
use limner_interface::ImageGenerator;
use limner_storage::{MediaKind, MediaStore, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// The Image stage loop.
///
/// A chunk becomes eligible once its prompt is set. The generated image is
/// downloaded and stored through the media store before the chunk is
/// marked; persistence is part of this stage's completion contract, so a
/// failed download or write leaves the chunk unset for the next sweep.
pub struct ImageStage {
    client: Arc<dyn ImageGenerator>,
    store: StateStore,
    media: MediaStore,
    config: PipelineConfig,
}

impl ImageStage {
    /// Create the stage.
    pub fn new(
        client: Arc<dyn ImageGenerator>,
        store: StateStore,
        media: MediaStore,
        config: PipelineConfig,
    ) -> Self {
        Self {
            client,
            store,
            media,
            config,
        }
    }

    /// Sweep the book until every chunk has a stored image, the Prompt
    /// stage is finished with nothing left to wait for, or the
    /// fruitless-sweep bound is exhausted.
    ///
    /// # Errors
    ///
    /// Only state-persistence failures propagate.
    #[instrument(skip_all, fields(stage = "image"))]
    pub async fn run(&self, book: &Book, upstream: &StageGate) -> LimnerResult<StageReport> {
        let mut sweeps = 0;
        let mut fruitless = 0;
        while !book.is_image_done() {
            let tally = self.sweep(book).await?;
            sweeps += 1;
            if book.is_image_done() {
                break;
            }
            if tally.attempted == 0 {
                if upstream.is_open() {
                    break;
                }
            } else if tally.resolved == 0 {
                fruitless += 1;
                if fruitless >= self.config.max_sweeps {
                    break;
                }
            } else {
                fruitless = 0;
            }
            tokio::time::sleep(Duration::from_millis(self.config.idle_backoff_ms)).await;
        }
        Ok(StageReport::finish(
            "image",
            book,
            sweeps,
            Chunk::is_image_set,
        ))
    }

    async fn sweep(&self, book: &Book) -> LimnerResult<SweepTally> {
        let mut tally = SweepTally::default();
        for chunk in book.chunks() {
            if chunk.is_image_set() {
                continue;
            }
            let Some(prompt) = chunk.prompt_text() else {
                continue;
            };
            tally.attempted += 1;

            let positive_prompt = format!("{}{}", self.config.style_tag, prompt);
            let artifact = match self.client.generate_image(&positive_prompt).await {
                GenerationOutcome::Success(artifact) => artifact,
                GenerationOutcome::Retryable(reason)
                | GenerationOutcome::SchemaInvalid(reason)
                | GenerationOutcome::Fatal(reason) => {
                    warn!(chunk = %chunk.key(), reason = %reason, "image generation failed");
                    continue;
                }
            };

            let bytes = match self.client.download(&artifact.url).await {
                GenerationOutcome::Success(bytes) => bytes,
                GenerationOutcome::Retryable(reason)
                | GenerationOutcome::SchemaInvalid(reason)
                | GenerationOutcome::Fatal(reason) => {
                    warn!(chunk = %chunk.key(), reason = %reason, "image download failed");
                    continue;
                }
            };

            let reference = match self.media.store(&bytes, MediaKind::Image).await {
                Ok(reference) => reference,
                Err(e) => {
                    warn!(chunk = %chunk.key(), error = %e, "image persistence failed");
                    continue;
                }
            };

            let state = chunk.set_image(reference.path, artifact.task_id)?;
            self.store.save_chunk(&state).await?;
            tally.resolved += 1;
            debug!(chunk = %chunk.key(), "image stored");
        }
        Ok(tally)
    }
}
