//! HTTP server exposing ingestion, search and ask.
//!
//! The browser UI in `server.static_dir` is served under `/app`.

#[cfg(feature = "http-server")]
pub mod error;
#[cfg(feature = "http-server")]
pub mod routes;

#[cfg(feature = "http-server")]
pub use error::ApiError;

#[cfg(feature = "http-server")]
use crate::service::RagService;

/// Shared state for request handlers.
#[cfg(feature = "http-server")]
pub struct AppState {
    pub service: RagService,
}

/// Build the router with every endpoint, static UI and middleware.
#[cfg(feature = "http-server")]
pub fn build_router(
    service: RagService,
    server: &crate::config::ServerConfig,
    static_dir: &std::path::Path,
) -> axum::Router {
    use axum::extract::DefaultBodyLimit;
    use axum::response::Redirect;
    use axum::routing::{get, post};
    use std::sync::Arc;
    use tower_http::services::ServeDir;
    use tower_http::trace::TraceLayer;

    let shared = Arc::new(AppState { service });

    axum::Router::new()
        .route("/", get(|| async { Redirect::temporary("/app/") }))
        .route("/health", get(routes::health_check))
        .route("/upload", post(routes::upload))
        .route("/stats", get(routes::stats))
        .route("/documents", get(routes::documents))
        .route("/search", get(routes::search))
        .route("/ask", post(routes::ask))
        .route("/reset", post(routes::reset))
        .nest_service("/app", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// CORS from configured origins; `*` allows any.
#[cfg(feature = "http-server")]
fn cors_layer(origins: &[String]) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method};
    use tower_http::cors::{Any, CorsLayer};

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.trim().parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(target: "server", "ignoring invalid CORS origin '{o}'");
                None
            }
        })
        .collect();
    cors.allow_origin(origins)
}

/// Serve until Ctrl+C.
#[cfg(feature = "http-server")]
pub async fn serve_http(settings: crate::Settings, bind: String) -> anyhow::Result<()> {
    let service = RagService::from_settings(&settings)?;
    let static_dir = settings.static_dir();
    if !static_dir.is_dir() {
        tracing::warn!(
            target: "server",
            "static UI directory {} not found, /app will return 404",
            static_dir.display()
        );
    }

    let router = build_router(service, &settings.server, &static_dir);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    crate::log_event!("http", "listening", "http://{bind}");
    eprintln!("docqa listening on http://{bind}");
    eprintln!("UI: http://{bind}/app/");
    eprintln!("Press Ctrl+C to stop the server");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    crate::log_event!("http", "stopped");
    eprintln!("Server shut down gracefully");
    Ok(())
}

#[cfg(feature = "http-server")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "server", "failed to listen for ctrl+c: {e}");
        std::future::pending::<()>().await;
    }
    eprintln!("Received shutdown signal");
}

#[cfg(not(feature = "http-server"))]
pub async fn serve_http(_settings: crate::Settings, _bind: String) -> anyhow::Result<()> {
    anyhow::bail!("docqa was built without the http-server feature")
}
