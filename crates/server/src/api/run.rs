//! Authenticated batch question-answering endpoint.
//!
//! `POST /api/v1/query/run` answers a batch of questions against the fixed
//! local document. The first authorized request extracts, chunks, embeds,
//! and persists the index; later requests (and restarts) load the cached
//! artifact instead of re-embedding.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use docuquery_llm::{answer_batch, RetrievalResult, BATCH_TOP_K};

use crate::state::{AppState, SharedIndex};

use super::ErrorResponse;

type Rejection = (StatusCode, Json<ErrorResponse>);

#[derive(Deserialize)]
pub struct RunRequest {
    /// Reserved. The batch API currently serves a fixed local document and
    /// ignores this field.
    #[serde(default)]
    pub documents: String,
    pub questions: Vec<String>,
}

#[derive(Serialize)]
pub struct RunResponse {
    pub answers: Vec<RetrievalResult>,
}

fn reject(status: StatusCode, error: impl Into<String>) -> Rejection {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Compare the bearer credential before any index/search/synthesis work.
fn check_auth(state: &AppState, headers: &HeaderMap) -> Result<(), Rejection> {
    let expected = state.auth_token.as_deref().ok_or_else(|| {
        reject(
            StatusCode::SERVICE_UNAVAILABLE,
            "API auth token not configured",
        )
    })?;

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let expected_header = format!("Bearer {expected}");
    if presented != Some(expected_header.as_str()) {
        return Err(reject(
            StatusCode::UNAUTHORIZED,
            "Invalid authorization token",
        ));
    }
    Ok(())
}

/// Ensure the shared index is built or loaded, exactly once.
///
/// Double-checked under the write lock so concurrent first requests do not
/// rebuild; the write lock also keeps a rebuild from overlapping any
/// in-flight search.
async fn ensure_index(state: &AppState, index: &SharedIndex) -> Result<(), Rejection> {
    if index.read().await.is_built() {
        return Ok(());
    }

    let mut guard = index.write().await;
    if guard.is_built() {
        // Another request finished the build while we waited.
        return Ok(());
    }

    if state.artifact_path.exists() {
        info!("Loading cached index from {}", state.artifact_path.display());
        guard.load(&state.artifact_path).map_err(|e| {
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load index artifact: {e}"),
            )
        })?;
        return Ok(());
    }

    if !state.document_path.exists() {
        return Err(reject(
            StatusCode::NOT_FOUND,
            format!("Local file not found: {}", state.document_path.display()),
        ));
    }

    info!("Processing local file: {}", state.document_path.display());
    let bytes = tokio::fs::read(&state.document_path).await.map_err(|e| {
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read document: {e}"),
        )
    })?;
    let filename = state
        .document_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf");

    let doc = docuquery_ingest::extract_text(&bytes, filename).map_err(|e| {
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Text extraction failed: {e}"),
        )
    })?;
    let chunks = docuquery_ingest::extract_chunks(&doc);
    info!(
        "Extracted '{}': {} pages, {} chunks",
        filename,
        doc.pages.len(),
        chunks.len()
    );

    guard.build(chunks).await.map_err(|e| {
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Index build failed: {e}"),
        )
    })?;

    // A failed save costs a rebuild on restart, not this request.
    if let Err(e) = guard.save(&state.artifact_path) {
        warn!(
            "Failed to save index artifact to {}: {}",
            state.artifact_path.display(),
            e
        );
    }

    Ok(())
}

pub async fn run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunResponse>, Rejection> {
    check_auth(&state, &headers)?;

    let index = state.index.as_ref().ok_or_else(|| {
        reject(
            StatusCode::SERVICE_UNAVAILABLE,
            "Embedding provider not configured",
        )
    })?;

    ensure_index(&state, index).await?;

    let answers = answer_batch(
        req.questions,
        index.clone(),
        state.synthesizer.clone(),
        BATCH_TOP_K,
        state.max_concurrency,
    )
    .await;

    Ok(Json(RunResponse { answers }))
}
