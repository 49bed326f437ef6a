//! Ingest command - store local files.

use std::path::PathBuf;

use anyhow::Context;

use crate::config::Settings;
use crate::ingest::{IngestStatus, UploadedFile};

/// Read each file and ingest the batch.
///
/// Unreadable paths fail the command before anything is stored; per-file
/// extraction failures are reported like the upload endpoint does.
pub async fn run(settings: &Settings, paths: Vec<PathBuf>, json: bool) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(UploadedFile::new(filename, None, data));
    }

    let service = super::open_service(settings)?;
    let outcomes = service.ingest(files).await;

    if json {
        return crate::cli::print_json(&serde_json::json!({ "results": outcomes }));
    }

    for outcome in &outcomes {
        match outcome.status {
            IngestStatus::Success => {
                println!("{}: {} chunks", outcome.filename, outcome.chunks)
            }
            _ => println!("{}: {}", outcome.filename, outcome.status),
        }
    }
    Ok(())
}
