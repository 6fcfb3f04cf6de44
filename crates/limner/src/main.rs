//! Limner CLI binary.
//!
//! This binary provides command-line access to the enrichment pipeline:
//! ingest a plain-text book, then generate rolling summaries, image
//! prompts, images, and narrated audio for every chunk.

use clap::Parser;

mod cli;
mod extract;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, run_book};

    // Credentials come from the environment; a .env file is honored.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => {
            run_book(args).await?;
        }
    }

    Ok(())
}
