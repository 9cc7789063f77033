use anyhow::Result;
use console::style;
use std::fs;
use std::path::PathBuf;

use super::output::{location, preview, print_error, spinner, DOCUMENT, SUCCESS};
use crate::service::{DocumentService, UploadResult};

pub async fn run_ingest(service: &DocumentService, files: &[PathBuf], json: bool) -> Result<()> {
    let mut results: Vec<UploadResult> = Vec::with_capacity(files.len());
    let mut failures = 0;

    for path in files {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let pb = spinner(format!("{}Ingesting {}...", DOCUMENT, filename));
        let outcome = match fs::read(path) {
            Ok(bytes) => service
                .upload(&filename, &bytes)
                .await
                .map_err(anyhow::Error::from),
            Err(e) => {
                Err(anyhow::Error::new(e).context(format!("failed to read {}", path.display())))
            }
        };
        pb.finish_and_clear();

        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                failures += 1;
                print_error(&format!("{filename}: {e:#}"));
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            println!(
                "{}{} {} chunks",
                SUCCESS,
                style(&result.filename).green(),
                style(result.num_chunks).cyan()
            );
            if let Some(first) = &result.first_chunk_preview {
                println!(
                    "   {} {}",
                    style(location(first.page, first.start, first.end)).dim(),
                    style(preview(&first.text, 80)).dim()
                );
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} documents failed", failures, files.len());
    }
    Ok(())
}
