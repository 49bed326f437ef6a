//! Documents, Stats and Reset commands.

use crate::config::Settings;

pub async fn run_documents(
    settings: &Settings,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let service = super::open_service(settings)?;
    let documents = service.documents(limit).await?;

    if json {
        return crate::cli::print_json(&serde_json::json!({ "documents": documents }));
    }

    if documents.is_empty() {
        println!("No documents ingested.");
    }
    for doc in &documents {
        println!("{:>6}  {}", doc.chunks, doc.filename);
    }
    Ok(())
}

pub async fn run_stats(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let service = super::open_service(settings)?;
    let stats = service.stats().await?;

    if json {
        return crate::cli::print_json(&stats);
    }

    println!("Total chunks: {}", stats.total_chunks);
    println!("Model:        {}", stats.model);
    println!("Embedding:    {}", stats.embedding);
    Ok(())
}

pub async fn run_reset(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let service = super::open_service(settings)?;
    let generation = service.reset().await?;

    if json {
        return crate::cli::print_json(&serde_json::json!({
            "status": "ok",
            "generation": generation,
        }));
    }

    println!("Collection reset (generation {generation}).");
    Ok(())
}
