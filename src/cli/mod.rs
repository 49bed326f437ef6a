//! CLI module for the document QA service.
//!
//! Provides command-line interface parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};

use std::path::PathBuf;

use crate::config::Settings;

/// Load settings from `--config` or by workspace discovery.
pub fn load_settings(config: Option<&PathBuf>) -> anyhow::Result<Settings> {
    let settings = match config {
        Some(path) => Settings::load_from(path).map_err(|e| {
            anyhow::anyhow!("failed to load configuration from {}: {e}", path.display())
        })?,
        None => Settings::load().map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?,
    };
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(settings)
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init { force } = cli.command {
        return commands::init::run_init(force);
    }

    let settings = load_settings(cli.config.as_ref())?;
    crate::logging::init_with_config(&settings.logging);
    let json = cli.json;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Config => commands::init::run_config(&settings, json),
        Commands::Serve { bind } => commands::serve::run(settings, bind).await,
        Commands::Ingest { files } => commands::ingest::run(&settings, files, json).await,
        Commands::Search { query, k } => commands::query::run_search(&settings, &query, k, json).await,
        Commands::Ask {
            question,
            k,
            temperature,
        } => commands::query::run_ask(&settings, &question, k, temperature, json).await,
        Commands::Documents { limit } => {
            commands::collection::run_documents(&settings, limit, json).await
        }
        Commands::Stats => commands::collection::run_stats(&settings, json).await,
        Commands::Reset => commands::collection::run_reset(&settings, json).await,
    }
}

/// Print a serializable value as pretty JSON.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
