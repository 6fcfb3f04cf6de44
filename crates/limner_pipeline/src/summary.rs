//! Summary stage: rolling narrative summaries with an evolving
//! character/place knowledge base.

use crate::config::PipelineConfig;
use crate::prompts::{SUMMARY_REPAIR_ROLE, SUMMARY_ROLE};
use crate::repair::repair;
use crate::schema::{StageSchema, SummaryPayload, SummaryResponse};
use crate::stage::StageReport;
use limner_core::{Book, ChatRequest, Chunk, GenerationOutcome, SummaryContext};
use limner_error::{JsonError, LimnerResult};
use limner_interface::TextGenerator;
use limner_storage::StateStore;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// The Summary stage loop.
///
/// Chunks are processed strictly in order because each request's context is
/// literally the preceding chunk's result; this stage never parallelizes
/// within a book. A chunk whose generation stays unresolved after retry and
/// repair inherits the preceding chunk's context and is explicitly marked
/// as inherited, so downstream consumers can tell real summaries from
/// copied ones.
pub struct SummaryStage {
    client: Arc<dyn TextGenerator>,
    store: StateStore,
    config: PipelineConfig,
}

impl SummaryStage {
    /// Create the stage.
    pub fn new(client: Arc<dyn TextGenerator>, store: StateStore, config: PipelineConfig) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Sweep the book until every chunk has a summary or the sweep bound is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Only state-persistence failures propagate; generation failures are
    /// absorbed by retry, repair, and the inheritance fallback.
    #[instrument(skip_all, fields(stage = "summary"))]
    pub async fn run(&self, book: &Book) -> LimnerResult<StageReport> {
        let mut sweeps = 0;
        while !book.is_summary_done() && sweeps < self.config.max_sweeps {
            sweeps += 1;
            self.sweep(book).await?;
        }
        Ok(StageReport::finish(
            "summary",
            book,
            sweeps,
            Chunk::is_summary_set,
        ))
    }

    async fn sweep(&self, book: &Book) -> LimnerResult<()> {
        let mut context = SummaryContext::default();
        for chunk in book.chunks() {
            if chunk.is_summary_set() {
                context = chunk.summary_context();
                continue;
            }

            match self.resolve(chunk, &context).await {
                Some(response) => {
                    let state = chunk.set_summary(
                        response.summary,
                        response.characters,
                        response.places,
                        false,
                    )?;
                    self.store.save_chunk(&state).await?;
                    debug!(chunk = %chunk.key(), "summary set");
                }
                None if !context.is_seed() => {
                    // Unresolved: inherit the preceding chunk's context,
                    // flagged so it is never mistaken for a real summary.
                    let state = chunk.set_summary(
                        context.summary.clone(),
                        context.characters.clone(),
                        context.places.clone(),
                        true,
                    )?;
                    self.store.save_chunk(&state).await?;
                    warn!(chunk = %chunk.key(), "summary unresolved, inherited preceding context");
                }
                None => {
                    warn!(
                        chunk = %chunk.key(),
                        "summary unresolved with no preceding context, retrying next sweep"
                    );
                }
            }

            if chunk.is_summary_set() {
                context = chunk.summary_context();
            }
        }
        Ok(())
    }

    async fn resolve(&self, chunk: &Chunk, context: &SummaryContext) -> Option<SummaryResponse> {
        let request = match summary_request(chunk.text(), context) {
            Ok(request) => request,
            Err(e) => {
                warn!(chunk = %chunk.key(), error = %e, "could not encode summary request");
                return None;
            }
        };

        match self.client.generate(&request).await {
            GenerationOutcome::Success(raw) => match SummaryResponse::parse(&raw) {
                Some(response) => Some(response),
                None => {
                    repair::<SummaryResponse>(self.client.as_ref(), SUMMARY_REPAIR_ROLE, raw).await
                }
            },
            GenerationOutcome::SchemaInvalid(raw) => {
                repair::<SummaryResponse>(self.client.as_ref(), SUMMARY_REPAIR_ROLE, raw).await
            }
            GenerationOutcome::Retryable(reason) | GenerationOutcome::Fatal(reason) => {
                warn!(chunk = %chunk.key(), reason = %reason, "summary generation failed");
                None
            }
        }
    }
}

fn summary_request(chunk_text: &str, context: &SummaryContext) -> LimnerResult<ChatRequest> {
    let user = serde_json::to_string(&SummaryPayload::new(chunk_text, context))
        .map_err(|e| JsonError::new(format!("summary payload: {}", e)))?;
    Ok(ChatRequest {
        system: SUMMARY_ROLE.to_string(),
        user,
    })
}
