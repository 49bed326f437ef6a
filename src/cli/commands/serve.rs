//! Serve command - HTTP API and browser UI.

use crate::config::Settings;

/// Run the serve command. `--bind` wins over `server.bind`.
pub async fn run(settings: Settings, bind: Option<String>) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
    crate::server::serve_http(settings, bind).await
}
