use anyhow::Result;
use console::style;

use super::output::{location, preview, DOCUMENT, SEARCH};
use crate::service::DocumentService;

pub async fn run_search(
    service: &DocumentService,
    question: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let retrieval = service.retrieval();
    let k = limit.unwrap_or_else(|| retrieval.default_k());
    let results = retrieval.retrieve(question, k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No passages found for: {}", style(question).italic());
        return Ok(());
    }

    println!(
        "\n{}Found {} passages for: {}\n",
        SEARCH,
        style(results.len()).cyan(),
        style(question).yellow().bold()
    );

    for (i, hit) in results.iter().enumerate() {
        let payload = &hit.payload;
        println!(
            "{} {}. {} {}",
            DOCUMENT,
            style(i + 1).dim(),
            style(location(payload.page, payload.start, payload.end)).green(),
            style(format!("score {:.3}", hit.score)).cyan()
        );
        println!("   {}", style(preview(&payload.text, 200)).dim());
        println!();
    }

    Ok(())
}
