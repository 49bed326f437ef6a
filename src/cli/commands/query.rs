//! Search and Ask commands.

use crate::config::Settings;

pub async fn run_search(
    settings: &Settings,
    query: &str,
    k: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let service = super::open_service(settings)?;
    let results = service.search(query, k).await?;

    if json {
        return crate::cli::print_json(&serde_json::json!({ "results": results }));
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (rank, hit) in results.iter().enumerate() {
        println!(
            "{}. {} #{} (distance {:.4})",
            rank + 1,
            hit.filename,
            hit.idx,
            hit.distance
        );
        println!("   {}", hit.snippet);
    }
    Ok(())
}

pub async fn run_ask(
    settings: &Settings,
    question: &str,
    k: Option<usize>,
    temperature: Option<f32>,
    json: bool,
) -> anyhow::Result<()> {
    let service = super::open_service(settings)?;
    let answer = service.ask(question, k, temperature).await?;

    if json {
        return crate::cli::print_json(&answer);
    }

    println!("{}", answer.answer);
    if !answer.sources.is_empty() {
        println!();
        println!("Sources: {}", answer.sources.join(", "));
    }
    Ok(())
}
