//! Command-line interface and pipeline wiring.

use crate::extract;
use clap::{Args, Parser, Subcommand};
use limner_core::{Book, Chunker, CoreBpeTokenizer};
use limner_error::LimnerResult;
use limner_pipeline::{Orchestrator, PipelineConfigBuilder, PipelineReport};
use limner_services::{
    ChatClient, ChatConfigBuilder, ImageClient, ImageConfigBuilder, SpeechClient,
    SpeechConfigBuilder,
};
use limner_storage::{MediaStore, StateStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "limner", version, about = "Turn a book into an illustrated, narrated derivative")]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the enrichment pipeline over a book.
    Run(RunArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the book: a directory of chapter `.txt` files, or a single
    /// text file with `# ` chapter headings.
    pub book: PathBuf,

    /// Directory for durable recovery state.
    #[arg(long, default_value = "state")]
    pub state_dir: PathBuf,

    /// Directory for generated media.
    #[arg(long, default_value = "media")]
    pub media_dir: PathBuf,

    /// Token bound per chunk.
    #[arg(long, default_value_t = 7000)]
    pub max_tokens: usize,

    /// Sweep bound per stage before partial completion is reported.
    #[arg(long, default_value_t = 50)]
    pub max_sweeps: usize,

    /// Chat completions API key (Summary and Prompt stages).
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: String,

    /// Image generation API key.
    #[arg(long, env = "RUNWARE_API_KEY", hide_env_values = true)]
    pub runware_api_key: String,

    /// Text-to-speech API key.
    #[arg(long, env = "TTS_API_KEY", hide_env_values = true)]
    pub tts_api_key: String,
}

/// Load (or resume) the book and drive the pipeline to completion.
pub async fn run_book(args: RunArgs) -> LimnerResult<()> {
    // The tokenizer is expensive to load; construct once and inject.
    let tokenizer = Arc::new(CoreBpeTokenizer::cl100k()?);
    let chunker = Chunker::new(tokenizer, args.max_tokens);

    let store = StateStore::new(&args.state_dir)?;
    let media = MediaStore::new(&args.media_dir)?;

    let chapters = extract::load_chapters(&args.book)?;
    info!(chapters = chapters.len(), book = %args.book.display(), "loaded book");

    let book = match store.load_book().await? {
        Some(state) => Book::with_id(state.book_id, chapters, &chunker)?,
        None => Book::from_chapters(chapters, &chunker)?,
    };
    let persisted = store.load_chunks().await?;
    if !persisted.is_empty() {
        info!(chunks = persisted.len(), "resuming from persisted state");
        book.restore(&persisted);
    }
    store.save_book(&book.state()).await?;

    let chat = Arc::new(ChatClient::new(
        ChatConfigBuilder::default()
            .api_key(args.groq_api_key)
            .build()
            .expect("chat config defaults are valid"),
    )?);
    let image = Arc::new(ImageClient::new(
        ImageConfigBuilder::default()
            .api_key(args.runware_api_key)
            .build()
            .expect("image config defaults are valid"),
    )?);
    let speech = Arc::new(SpeechClient::new(
        SpeechConfigBuilder::default()
            .api_key(args.tts_api_key)
            .build()
            .expect("speech config defaults are valid"),
    )?);

    let config = PipelineConfigBuilder::default()
        .max_sweeps(args.max_sweeps)
        .build()
        .expect("pipeline config defaults are valid");

    let orchestrator = Orchestrator::new(chat, image, speech, store, media, config);
    let report = orchestrator.run(Arc::new(book)).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &PipelineReport) {
    for stage in &report.stages {
        println!(
            "{:<8} {} ({} done, {} unresolved, {} sweeps)",
            stage.stage,
            if stage.converged { "converged" } else { "partial" },
            stage.completed,
            stage.unresolved,
            stage.sweeps,
        );
    }
    if report.is_done {
        println!("book fully enriched");
    } else {
        println!("book partially enriched; re-run to continue");
    }
}
