//! Audio stage: narrate each summary and store the bytes.

use crate::config::PipelineConfig;
use crate::stage::{StageGate, StageReport};
use limner_core::{Book, Chunk, GenerationOutcome};
use limner_error::LimnerResult;
use limner_interface::SpeechSynthesizer;
use limner_storage::{MediaKind, MediaStore, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// The Audio stage loop.
///
/// A chunk becomes eligible once its summary is set; this stage is
/// independent of Prompt and Image. Once the Summary stage has converged,
/// a bounded number of grace sweeps gives persistently failing chunks a
/// final chance before the stage gives up.
pub struct AudioStage {
    client: Arc<dyn SpeechSynthesizer>,
    store: StateStore,
    media: MediaStore,
    config: PipelineConfig,
}

impl AudioStage {
    /// Create the stage.
    pub fn new(
        client: Arc<dyn SpeechSynthesizer>,
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

    /// Sweep the book until every chunk has narrated audio, or the grace
    /// budget after the Summary stage finishes runs out.
    ///
    /// # Errors
    ///
    /// Only state-persistence failures propagate.
    #[instrument(skip_all, fields(stage = "audio"))]
    pub async fn run(&self, book: &Book, upstream: &StageGate) -> LimnerResult<StageReport> {
        let mut sweeps = 0;
        let mut grace = 0;
        while !book.is_audio_done() {
            sweeps += 1;
            self.sweep(book).await?;
            if book.is_audio_done() {
                break;
            }
            if upstream.is_open() || book.is_summary_done() {
                grace += 1;
                if grace >= self.config.audio_grace_sweeps {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(self.config.idle_backoff_ms)).await;
        }
        Ok(StageReport::finish(
            "audio",
            book,
            sweeps,
            Chunk::is_audio_done,
        ))
    }

    async fn sweep(&self, book: &Book) -> LimnerResult<()> {
        for chunk in book.chunks() {
            if chunk.is_audio_done() {
                continue;
            }
            let Some(summary) = chunk.summary_text() else {
                continue;
            };

            let bytes = match self.client.synthesize(&summary).await {
                GenerationOutcome::Success(bytes) => bytes,
                GenerationOutcome::Retryable(reason)
                | GenerationOutcome::SchemaInvalid(reason)
                | GenerationOutcome::Fatal(reason) => {
                    warn!(chunk = %chunk.key(), reason = %reason, "speech synthesis failed");
                    continue;
                }
            };

            if let Err(e) = self.media.store(&bytes, MediaKind::Audio).await {
                warn!(chunk = %chunk.key(), error = %e, "audio persistence failed");
                continue;
            }

            let state = chunk.set_audio_done();
            self.store.save_chunk(&state).await?;
            debug!(chunk = %chunk.key(), "audio stored");
        }
        Ok(())
    }
}
