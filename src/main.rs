use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use docqa::answer::create_generator;
use docqa::cli::{run_ask, run_chunk, run_ingest, run_search, run_status, Args, Command};
use docqa::config::Config;
use docqa::logging;
use docqa::service::DocumentService;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    logging::init_with_config(&config.logging);

    match args.command {
        Command::Chunk {
            file,
            size,
            overlap,
            json,
        } => run_chunk(&config, &file, size, overlap, json),
        Command::Ingest { files, json } => {
            let service = DocumentService::from_config(&config)?;
            run_ingest(&service, &files, json).await
        }
        Command::Search {
            question,
            limit,
            json,
        } => {
            let service = DocumentService::from_config(&config)?;
            run_search(&service, &question, limit, json).await
        }
        Command::Ask { question, json } => {
            let generator = create_generator(&config.generator)?;
            let service =
                DocumentService::from_config(&config)?.with_generator(Arc::from(generator));
            run_ask(&service, &question, json).await
        }
        Command::Status { json } => {
            let service = DocumentService::from_config(&config)?;
            run_status(&service, &config, json).await
        }
    }
}
