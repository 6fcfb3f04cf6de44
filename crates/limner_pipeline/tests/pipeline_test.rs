//! Integration tests for the stage loops and orchestrator, driven by
//! scripted mock services.

use async_trait::async_trait;
use limner_core::{
    Book, ChatRequest, Chunker, GenerationOutcome, ImageArtifact, Tokenizer,
};
use limner_error::LimnerResult;
use limner_interface::{ImageGenerator, SpeechSynthesizer, TextGenerator};
use limner_pipeline::{
    AudioStage, ImageStage, MAX_VALIDATION_ERROR_TRY, Orchestrator, PipelineConfig,
    PipelineConfigBuilder, PromptStage, StageGate, SummaryStage,
};
use limner_storage::{MediaStore, StateStore};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// One token per character, so chunk boundaries are exact.
struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> LimnerResult<Vec<usize>> {
        Ok(text.chars().map(|c| c as usize).collect())
    }

    fn decode(&self, tokens: &[usize]) -> LimnerResult<String> {
        Ok(tokens
            .iter()
            .filter_map(|&t| char::from_u32(t as u32))
            .collect())
    }
}

/// Build a single-chapter book with `n` five-character chunks.
fn book_with_chunks(n: usize) -> Book {
    let chunker = Chunker::new(Arc::new(CharTokenizer), 5);
    let text = "abcde".repeat(n);
    Book::from_chapters(vec![("One".to_string(), text)], &chunker).unwrap()
}

fn fast_config() -> PipelineConfig {
    PipelineConfigBuilder::default()
        .idle_backoff_ms(1u64)
        .build()
        .unwrap()
}

fn summary_json(n: usize) -> String {
    format!(
        r#"{{"summary":"summary-{}","characters":{{"Ann":"grey cloak"}},"places":{{}}}}"#,
        n
    )
}

fn prompt_json(n: usize) -> String {
    format!(r#"{{"scene_title":"scene-{}","prompt":"prompt-{}"}}"#, n, n)
}

type TextScript = Box<dyn Fn(usize, &ChatRequest) -> GenerationOutcome<String> + Send + Sync>;

struct ScriptedText {
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
    script: TextScript,
}

impl ScriptedText {
    fn new(script: impl Fn(usize, &ChatRequest) -> GenerationOutcome<String> + Send + Sync + 'static)
    -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            script: Box::new(script),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn user_payloads(&self) -> Vec<serde_json::Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| serde_json::from_str(&r.user).ok())
            .collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn generate(&self, req: &ChatRequest) -> GenerationOutcome<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(req.clone());
        (self.script)(n, req)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

struct ScriptedImage {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl ScriptedImage {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            fail: false,
        })
    }
}

#[async_trait]
impl ImageGenerator for ScriptedImage {
    async fn generate_image(&self, prompt: &str) -> GenerationOutcome<ImageArtifact> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return GenerationOutcome::Retryable("image service down".to_string());
        }
        GenerationOutcome::Success(ImageArtifact {
            url: format!("https://img.example/{}.webp", n),
            task_id: format!("task-{}", n),
            cost: Some(0.001),
            nsfw: false,
        })
    }

    async fn download(&self, url: &str) -> GenerationOutcome<Vec<u8>> {
        GenerationOutcome::Success(format!("bytes of {}", url).into_bytes())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

struct ScriptedSpeech {
    calls: AtomicUsize,
    fail: bool,
}

impl ScriptedSpeech {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn broken() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSpeech {
    async fn synthesize(&self, text: &str) -> GenerationOutcome<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return GenerationOutcome::Retryable("tts down".to_string());
        }
        GenerationOutcome::Success(format!("audio of {}", text).into_bytes())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

fn set_all_summaries(book: &Book) {
    for (n, chunk) in book.chunks().enumerate() {
        let mut characters = BTreeMap::new();
        characters.insert("Ann".to_string(), "grey cloak".to_string());
        chunk
            .set_summary(format!("summary-{}", n), characters, BTreeMap::new(), false)
            .unwrap();
    }
}

#[tokio::test]
async fn test_sequential_context_propagation() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();
    let book = book_with_chunks(3);

    let client = ScriptedText::new(|n, _| GenerationOutcome::Success(summary_json(n)));
    let stage = SummaryStage::new(client.clone(), store, fast_config());
    let report = stage.run(&book).await.unwrap();

    assert!(report.converged);
    assert_eq!(client.call_count(), 3);

    // Each request's context is the preceding chunk's result; the first
    // chunk starts from the empty seed.
    let payloads = client.user_payloads();
    assert_eq!(payloads[0]["past_context"], "");
    assert_eq!(payloads[0]["character_list"], serde_json::json!({}));
    assert_eq!(payloads[1]["past_context"], "summary-0");
    assert_eq!(payloads[1]["character_list"]["Ann"], "grey cloak");
    assert_eq!(payloads[2]["past_context"], "summary-1");

    let summaries: Vec<String> = book
        .chunks()
        .map(|c| c.summary_text().unwrap())
        .collect();
    assert_eq!(summaries, vec!["summary-0", "summary-1", "summary-2"]);
}

#[tokio::test]
async fn test_summary_resume_issues_no_calls() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();
    let book = book_with_chunks(3);
    set_all_summaries(&book);

    let client = ScriptedText::new(|n, _| GenerationOutcome::Success(summary_json(n)));
    let stage = SummaryStage::new(client.clone(), store, fast_config());
    let report = stage.run(&book).await.unwrap();

    assert!(report.converged);
    assert_eq!(report.sweeps, 0);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_validation_repair_bound() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();
    let book = book_with_chunks(1);

    let client =
        ScriptedText::new(|_, _| GenerationOutcome::SchemaInvalid("not the schema".to_string()));
    let config = PipelineConfigBuilder::default()
        .idle_backoff_ms(0u64)
        .max_sweeps(1usize)
        .build()
        .unwrap();
    let stage = SummaryStage::new(client.clone(), store, config);
    let report = stage.run(&book).await.unwrap();

    // One generation call plus exactly MAX_VALIDATION_ERROR_TRY repair
    // attempts, then the chunk is abandoned for the sweep.
    assert_eq!(client.call_count(), 1 + MAX_VALIDATION_ERROR_TRY);
    assert!(!report.converged);
    assert_eq!(report.unresolved, 1);
    assert!(book.chunks().next().unwrap().summary_text().is_none());
}

#[tokio::test]
async fn test_unresolved_summary_inherits_preceding_context() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();
    let book = book_with_chunks(2);

    let client = ScriptedText::new(|n, _| {
        if n == 0 {
            GenerationOutcome::Success(summary_json(0))
        } else {
            GenerationOutcome::Fatal("provider rejected request".to_string())
        }
    });
    let stage = SummaryStage::new(client.clone(), store.clone(), fast_config());
    let report = stage.run(&book).await.unwrap();

    assert!(report.converged);
    let chunks: Vec<_> = book.chunks().collect();
    assert!(!chunks[0].is_inherited());
    assert!(chunks[1].is_inherited());
    assert_eq!(chunks[1].summary_text().unwrap(), "summary-0");

    // The inherited flag survives in the durable mirror.
    let states = store.load_chunks().await.unwrap();
    assert!(states["0000_0002"].inherited);
    assert!(!states["0000_0001"].inherited);
}

#[tokio::test]
async fn test_prompt_stage_waits_for_summaries() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();
    let book = book_with_chunks(2);

    let client = ScriptedText::new(|n, _| GenerationOutcome::Success(prompt_json(n)));

    // No summaries yet and the Summary stage already finished: nothing
    // will ever become eligible, so the stage exits with partial results.
    let stage = PromptStage::new(client.clone(), store.clone(), fast_config());
    let report = stage.run(&book, &StageGate::opened()).await.unwrap();
    assert_eq!(client.call_count(), 0);
    assert!(!report.converged);

    // Once summaries exist the same stage fills every chunk.
    set_all_summaries(&book);
    let report = stage.run(&book, &StageGate::opened()).await.unwrap();
    assert!(report.converged);
    assert_eq!(client.call_count(), 2);

    let payloads = client.user_payloads();
    assert_eq!(payloads[0]["character_list"]["Ann"], "grey cloak");
    assert!(payloads[0]["input_text"].as_str().unwrap().contains("abcde"));

    let prompts: Vec<String> = book.chunks().map(|c| c.prompt_text().unwrap()).collect();
    assert_eq!(prompts, vec!["prompt-0", "prompt-1"]);
}

#[tokio::test]
async fn test_prompt_fruitless_sweeps_hit_the_bound() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();
    let book = book_with_chunks(2);
    set_all_summaries(&book);

    let client = ScriptedText::new(|_, _| GenerationOutcome::Fatal("bad request".to_string()));
    let config = PipelineConfigBuilder::default()
        .idle_backoff_ms(0u64)
        .max_sweeps(2usize)
        .build()
        .unwrap();
    let stage = PromptStage::new(client.clone(), store, config);
    let report = stage.run(&book, &StageGate::default()).await.unwrap();

    // Two fruitless sweeps over two eligible chunks, then the stage stops.
    assert!(!report.converged);
    assert_eq!(report.sweeps, 2);
    assert_eq!(client.call_count(), 4);
    assert_eq!(report.unresolved, 2);
}

#[tokio::test]
async fn test_image_stage_stores_bytes_before_marking() {
    let state_dir = TempDir::new().unwrap();
    let media_dir = TempDir::new().unwrap();
    let store = StateStore::new(state_dir.path()).unwrap();
    let media = MediaStore::new(media_dir.path()).unwrap();
    let book = book_with_chunks(2);
    set_all_summaries(&book);
    for (n, chunk) in book.chunks().enumerate() {
        chunk
            .set_prompt(format!("scene-{}", n), format!("prompt-{}", n))
            .unwrap();
    }

    let client = ScriptedImage::ok();
    let stage = ImageStage::new(client.clone(), store, media, fast_config());
    let report = stage.run(&book, &StageGate::opened()).await.unwrap();

    assert!(report.converged);
    for chunk in book.chunks() {
        let state = chunk.state();
        assert!(!state.image.is_empty());
        assert!(!state.image_task.is_empty());
        // Persistence happens before the chunk is marked.
        assert!(std::path::Path::new(&state.image).exists());
    }

    // The configured style tag is prepended to every prompt.
    let prompts = client.prompts.lock().unwrap();
    assert!(prompts.iter().all(|p| p.starts_with("Style:")));
}

#[tokio::test]
async fn test_audio_grace_sweeps_bound_the_stage() {
    let state_dir = TempDir::new().unwrap();
    let media_dir = TempDir::new().unwrap();
    let store = StateStore::new(state_dir.path()).unwrap();
    let media = MediaStore::new(media_dir.path()).unwrap();
    let book = book_with_chunks(1);
    set_all_summaries(&book);

    let client = ScriptedSpeech::broken();
    let config = PipelineConfigBuilder::default()
        .idle_backoff_ms(0u64)
        .audio_grace_sweeps(2usize)
        .build()
        .unwrap();
    let stage = AudioStage::new(client.clone(), store, media, config);
    let report = stage.run(&book, &StageGate::opened()).await.unwrap();

    assert!(!report.converged);
    assert_eq!(report.sweeps, 2);
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_orchestrator_full_run_and_idempotent_rerun() {
    let state_dir = TempDir::new().unwrap();
    let media_dir = TempDir::new().unwrap();
    let store = StateStore::new(state_dir.path()).unwrap();
    let media = MediaStore::new(media_dir.path()).unwrap();

    let chunker = Chunker::new(Arc::new(CharTokenizer), 5);
    let book = Arc::new(
        Book::from_chapters(
            vec![
                ("One".to_string(), "abcdefghij".to_string()),
                ("Two".to_string(), "klmno".to_string()),
            ],
            &chunker,
        )
        .unwrap(),
    );
    assert_eq!(book.chunk_count(), 3);

    let text = ScriptedText::new(|n, req| {
        if req.system.contains("text-to-image") {
            GenerationOutcome::Success(prompt_json(n))
        } else {
            GenerationOutcome::Success(summary_json(n))
        }
    });
    let image = ScriptedImage::ok();
    let speech = ScriptedSpeech::ok();

    let orchestrator = Orchestrator::new(
        text.clone(),
        image.clone(),
        speech.clone(),
        store.clone(),
        media.clone(),
        fast_config(),
    );
    let report = orchestrator.run(Arc::clone(&book)).await.unwrap();

    assert!(report.is_done);
    assert!(book.is_done());
    assert!(report.stages.iter().all(|s| s.converged));

    let book_state = store.load_book().await.unwrap().unwrap();
    assert!(book_state.is_done);
    assert_eq!(book_state.chunk_keys.len(), 3);
    assert_eq!(store.load_chunks().await.unwrap().len(), 3);

    // Re-running over a finished book issues zero external calls.
    let text2 = ScriptedText::new(|_, _| GenerationOutcome::Fatal("must not be called".into()));
    let image2 = ScriptedImage::ok();
    let speech2 = ScriptedSpeech::ok();
    let rerun = Orchestrator::new(
        text2.clone(),
        image2.clone(),
        speech2.clone(),
        store,
        media,
        fast_config(),
    );
    let report = rerun.run(Arc::clone(&book)).await.unwrap();
    assert!(report.is_done);
    assert_eq!(text2.call_count(), 0);
    assert_eq!(image2.calls.load(Ordering::SeqCst), 0);
    assert_eq!(speech2.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_summary_rerun_never_clears_existing_summaries() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();
    let book = book_with_chunks(2);
    set_all_summaries(&book);

    let client = ScriptedText::new(|_, _| {
        GenerationOutcome::Success(r#"{"summary":"replacement","characters":{}}"#.to_string())
    });
    let stage = SummaryStage::new(client.clone(), store, fast_config());
    stage.run(&book).await.unwrap();

    assert_eq!(client.call_count(), 0);
    let summaries: Vec<String> = book.chunks().map(|c| c.summary_text().unwrap()).collect();
    assert_eq!(summaries, vec!["summary-0", "summary-1"]);
}
