use anyhow::{Context, Result};
use console::style;
use std::fs;
use std::path::Path;

use super::output::{location, preview, DOCUMENT, INFO};
use crate::config::Config;
use crate::extract::{PlainTextExtractor, TextExtractor};
use crate::rag::{Chunker, NormalizedDocument};

/// Chunk a file locally and print the windows. Nothing is embedded or stored.
pub fn run_chunk(
    config: &Config,
    file: &Path,
    size: Option<usize>,
    overlap: Option<usize>,
    json: bool,
) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let extracted = PlainTextExtractor.extract(&bytes)?;

    let chunker = Chunker::new(
        size.unwrap_or(config.chunking.chunk_size),
        overlap.unwrap_or(config.chunking.overlap),
    )?;
    let document = NormalizedDocument::from_pages(&extracted.pages);
    let chunks = chunker.chunk_document(&document);

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    if chunks.is_empty() {
        println!("{}No text found in {}", INFO, file.display());
        return Ok(());
    }

    println!(
        "\n{}{}: {} chunks ({} chars, size {}, overlap {})\n",
        DOCUMENT,
        style(file.display()).green(),
        style(chunks.len()).cyan(),
        document.text.chars().count(),
        chunker.chunk_size(),
        chunker.overlap()
    );
    for (i, chunk) in chunks.iter().enumerate() {
        println!(
            "  {} {}",
            style(format!("#{i}")).dim(),
            style(location(chunk.page, chunk.start, chunk.end)).cyan()
        );
        println!("     {}", style(preview(&chunk.text, 80)).dim());
    }

    Ok(())
}
