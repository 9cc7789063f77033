use anyhow::Result;
use console::style;

use super::output::{location, spinner, INFO};
use crate::service::DocumentService;

pub async fn run_ask(service: &DocumentService, question: &str, json: bool) -> Result<()> {
    let pb = spinner(format!("Thinking about: {question}"));
    let result = service.ask(question).await;
    pb.finish_and_clear();
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("\n{}\n", result.answer.trim());
    if !result.sources.is_empty() {
        println!("{}Sources:", INFO);
        for source in &result.sources {
            println!(
                "  - {}",
                style(location(source.page, source.start, source.end)).dim()
            );
        }
    }

    Ok(())
}
