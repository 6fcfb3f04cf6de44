//! Prompt stage: per-chunk image-generation prompts.

use crate::config::PipelineConfig;
use crate::prompts::{PROMPT_REPAIR_ROLE, PROMPT_ROLE};
use crate::repair::repair;
use crate::schema::{PromptPayload, PromptResponse, StageSchema};
use crate::stage::{StageGate, StageReport, SweepTally};
use limner_core::{Book, ChatRequest, Chunk, GenerationOutcome};
use limner_error::{JsonError, LimnerResult};
use limner_interface::TextGenerator;
use limner_storage::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// The Prompt stage loop.
///
/// A chunk becomes eligible once its summary is set; the request carries
/// the chunk's raw text plus its own character/place maps. Chunks that stay
/// unresolved are left unset and revisited on the next sweep.
pub struct PromptStage {
    client: Arc<dyn TextGenerator>,
    store: StateStore,
    config: PipelineConfig,
}

impl PromptStage {
    /// Create the stage.
    pub fn new(client: Arc<dyn TextGenerator>, store: StateStore, config: PipelineConfig) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Sweep the book until every chunk has a prompt, the Summary stage is
    /// finished with nothing left to wait for, or the fruitless-sweep
    /// bound is exhausted.
    ///
    /// Sweeps that merely wait for summaries to appear do not consume the
    /// bound; only sweeps that attempted chunks and resolved none do.
    ///
    /// # Errors
    ///
    /// Only state-persistence failures propagate.
    #[instrument(skip_all, fields(stage = "prompt"))]
    pub async fn run(&self, book: &Book, upstream: &StageGate) -> LimnerResult<StageReport> {
        let mut sweeps = 0;
        let mut fruitless = 0;
        while !book.is_prompt_done() {
            let tally = self.sweep(book).await?;
            sweeps += 1;
            if book.is_prompt_done() {
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
            "prompt",
            book,
            sweeps,
            Chunk::is_prompt_set,
        ))
    }

    async fn sweep(&self, book: &Book) -> LimnerResult<SweepTally> {
        let mut tally = SweepTally::default();
        for chunk in book.chunks() {
            if chunk.is_prompt_set() || !chunk.is_summary_set() {
                continue;
            }
            tally.attempted += 1;

            if let Some(response) = self.resolve(chunk).await {
                let state = chunk.set_prompt(response.scene_title, response.prompt)?;
                self.store.save_chunk(&state).await?;
                tally.resolved += 1;
                debug!(chunk = %chunk.key(), "prompt set");
            }
        }
        Ok(tally)
    }

    async fn resolve(&self, chunk: &Chunk) -> Option<PromptResponse> {
        let request = match prompt_request(chunk) {
            Ok(request) => request,
            Err(e) => {
                warn!(chunk = %chunk.key(), error = %e, "could not encode prompt request");
                return None;
            }
        };

        match self.client.generate(&request).await {
            GenerationOutcome::Success(raw) => match PromptResponse::parse(&raw) {
                Some(response) => Some(response),
                None => {
                    repair::<PromptResponse>(self.client.as_ref(), PROMPT_REPAIR_ROLE, raw).await
                }
            },
            GenerationOutcome::SchemaInvalid(raw) => {
                repair::<PromptResponse>(self.client.as_ref(), PROMPT_REPAIR_ROLE, raw).await
            }
            GenerationOutcome::Retryable(reason) | GenerationOutcome::Fatal(reason) => {
                warn!(chunk = %chunk.key(), reason = %reason, "prompt generation failed");
                None
            }
        }
    }
}

fn prompt_request(chunk: &Chunk) -> LimnerResult<ChatRequest> {
    let context = chunk.summary_context();
    let user = serde_json::to_string(&PromptPayload {
        input_text: chunk.text(),
        character_list: &context.characters,
        places_list: &context.places,
    })
    .map_err(|e| JsonError::new(format!("prompt payload: {}", e)))?;
    Ok(ChatRequest {
        system: PROMPT_ROLE.to_string(),
        user,
    })
}
