//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod collection;
pub mod ingest;
pub mod init;
pub mod query;
pub mod serve;

use crate::config::Settings;
use crate::service::RagService;

/// Open the service for one-shot commands.
pub(crate) fn open_service(settings: &Settings) -> anyhow::Result<RagService> {
    Ok(RagService::from_settings(settings)?)
}
