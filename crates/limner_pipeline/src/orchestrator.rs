//! Concurrent stage orchestration.

use crate::config::PipelineConfig;
use crate::stage::{StageGate, StageReport};
use crate::{AudioStage, ImageStage, PromptStage, SummaryStage};
use limner_core::Book;
use limner_error::{LimnerResult, PipelineError, PipelineErrorKind};
use limner_interface::{ImageGenerator, SpeechSynthesizer, TextGenerator};
use limner_storage::{MediaStore, StateStore};
use std::sync::Arc;
use tracing::{info, instrument};

/// Aggregated outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Per-stage outcomes, in stage order.
    pub stages: Vec<StageReport>,
    /// Whether every chunk is fully enriched.
    pub is_done: bool,
}

/// Runs the four stage workers concurrently against one shared book.
///
/// Workers never call each other; each independently re-polls chunk
/// readiness, so cross-stage consistency is eventual. The orchestrator
/// waits for all four to finish and persists the book-level record.
pub struct Orchestrator {
    text: Arc<dyn TextGenerator>,
    image: Arc<dyn ImageGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
    store: StateStore,
    media: MediaStore,
    config: PipelineConfig,
}

impl Orchestrator {
    /// Create an orchestrator over the given services and stores.
    pub fn new(
        text: Arc<dyn TextGenerator>,
        image: Arc<dyn ImageGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
        store: StateStore,
        media: MediaStore,
        config: PipelineConfig,
    ) -> Self {
        Self {
            text,
            image,
            speech,
            store,
            media,
            config,
        }
    }

    /// Run all four stages to completion (or their bounds) and persist the
    /// final book record.
    ///
    /// # Errors
    ///
    /// Propagates state-persistence failures and worker panics; generation
    /// failures surface only as unconverged stages in the report.
    #[instrument(skip_all, fields(book = %book.book_id(), chunks = book.chunk_count()))]
    pub async fn run(&self, book: Arc<Book>) -> LimnerResult<PipelineReport> {
        if book.is_done() {
            info!("book already fully enriched, nothing to do");
            return Ok(PipelineReport {
                stages: Vec::new(),
                is_done: true,
            });
        }

        let summary = SummaryStage::new(
            Arc::clone(&self.text),
            self.store.clone(),
            self.config.clone(),
        );
        let prompt = PromptStage::new(
            Arc::clone(&self.text),
            self.store.clone(),
            self.config.clone(),
        );
        let image = ImageStage::new(
            Arc::clone(&self.image),
            self.store.clone(),
            self.media.clone(),
            self.config.clone(),
        );
        let audio = AudioStage::new(
            Arc::clone(&self.speech),
            self.store.clone(),
            self.media.clone(),
            self.config.clone(),
        );

        let summary_book = Arc::clone(&book);
        let prompt_book = Arc::clone(&book);
        let image_book = Arc::clone(&book);
        let audio_book = Arc::clone(&book);

        // Each gate opens when its stage's worker exits (even on panic),
        // so downstream stages can tell "still working" from "gave up".
        let summary_gate = StageGate::default();
        let prompt_gate = StageGate::default();

        let summary_worker = {
            let guard = OpenOnExit(summary_gate.clone());
            tokio::spawn(async move {
                let _guard = guard;
                summary.run(&summary_book).await
            })
        };
        let prompt_worker = {
            let guard = OpenOnExit(prompt_gate.clone());
            let gate = summary_gate.clone();
            tokio::spawn(async move {
                let _guard = guard;
                prompt.run(&prompt_book, &gate).await
            })
        };
        let image_worker = {
            let gate = prompt_gate;
            tokio::spawn(async move { image.run(&image_book, &gate).await })
        };
        let audio_worker = {
            let gate = summary_gate;
            tokio::spawn(async move { audio.run(&audio_book, &gate).await })
        };

        let summary_report = join_stage(summary_worker).await?;
        let prompt_report = join_stage(prompt_worker).await?;
        let image_report = join_stage(image_worker).await?;
        let audio_report = join_stage(audio_worker).await?;

        self.store.save_book(&book.state()).await?;

        let report = PipelineReport {
            stages: vec![summary_report, prompt_report, image_report, audio_report],
            is_done: book.is_done(),
        };
        info!(is_done = report.is_done, "pipeline run finished");
        Ok(report)
    }
}

/// Opens a gate when dropped, covering both normal exit and panic.
struct OpenOnExit(StageGate);

impl Drop for OpenOnExit {
    fn drop(&mut self) {
        self.0.open();
    }
}

/// Flatten a `JoinHandle<LimnerResult<T>>` into a `LimnerResult<T>`.
async fn join_stage<T>(handle: tokio::task::JoinHandle<LimnerResult<T>>) -> LimnerResult<T> {
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(PipelineError::new(PipelineErrorKind::WorkerFailed(format!(
            "stage worker join failed: {}",
            e
        )))
        .into()),
    }
}
