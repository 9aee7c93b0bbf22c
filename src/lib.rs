pub mod chunking;
pub mod cli;
pub mod consensus;
pub mod error;
pub mod features;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod settings;
mod utils;

use clap::Parser;

pub use error::{ChunkError, ChunkResult, ReduceError};
pub use pipeline::{run_pipeline, run_pipeline_concurrent, PipelineReport, PipelineRequest};

pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = cli::Cli::parse();
    log::info!("chatpulse starting on {}", cli.chat_log.display());

    cli::execute(&cli)
}
