use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub index_ready: bool,
    pub llm_available: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let index_ready = match state.index.as_ref() {
        Some(index) => index.read().await.is_built(),
        None => false,
    };
    Json(HealthResponse {
        status: "ok",
        index_ready,
        llm_available: state.synthesizer.is_available(),
    })
}
