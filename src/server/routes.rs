//! HTTP handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use crate::ingest::UploadedFile;

/// Multipart field carrying uploaded files.
const UPLOAD_FIELD: &str = "files";

#[derive(Debug, Deserialize)]
pub struct DocumentsParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AskBody {
    pub question: String,
    pub k: Option<usize>,
    pub temperature: Option<f32>,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /upload: one result per uploaded file.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("unknown")
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        files.push(UploadedFile::new(filename, content_type, data.to_vec()));
    }

    if files.is_empty() {
        return Err(ApiError::bad_request(format!(
            "no files in multipart field '{UPLOAD_FIELD}'"
        )));
    }

    let results = state.service.ingest(files).await;
    Ok(Json(json!({ "results": results })))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let stats = state.service.stats().await?;
    Ok(Json(json!(stats)))
}

pub async fn documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DocumentsParams>,
) -> Result<Json<Value>, ApiError> {
    let documents = state.service.documents(params.limit).await?;
    Ok(Json(json!({ "documents": documents })))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let results = state.service.search(&params.q, params.k).await?;
    Ok(Json(json!({ "results": results })))
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AskBody>,
) -> Result<Json<Value>, ApiError> {
    let answer = state
        .service
        .ask(&body.question, body.k, body.temperature)
        .await?;
    Ok(Json(json!(answer)))
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let generation = state.service.reset().await?;
    Ok(Json(json!({
        "status": "ok",
        "generation": generation,
    })))
}
