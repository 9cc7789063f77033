use anyhow::Result;
use console::style;

use super::output::INFO;
use crate::config::{Config, StoreBackend};
use crate::service::DocumentService;

pub async fn run_status(service: &DocumentService, config: &Config, json: bool) -> Result<()> {
    let status = service.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let backend = match config.store.backend {
        StoreBackend::Embedded => match &config.store.path {
            Some(path) => format!("embedded ({})", path.display()),
            None => "embedded (in memory)".to_string(),
        },
        StoreBackend::Qdrant => format!("qdrant ({})", config.store.url),
    };

    println!("\n{}Collection: {}\n", INFO, style(&status.name).green());
    println!("  Store:           {}", backend);
    println!(
        "  Embedder:        {:?} / {}",
        config.embedder.provider, config.embedder.model
    );
    println!("  Dimension:       {}", style(status.dimension).cyan());
    println!("  Distance:        {:?}", status.distance);
    println!("  Points:          {}", style(status.points).yellow());

    Ok(())
}
