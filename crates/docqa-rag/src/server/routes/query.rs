//! Question answering endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::QueryAnswer;

/// Body of an ask request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// POST /api/stores/:store/ask - Answer a question from the store
pub async fn ask(
    State(state): State<AppState>,
    Path(store): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<QueryAnswer>> {
    let start = Instant::now();
    tracing::info!("Question for '{}': \"{}\"", store, request.question);

    let answer = state.pipeline().ask(&store, &request.question).await?;

    tracing::info!(
        "Answered from '{}' in {}ms ({} sources)",
        store,
        start.elapsed().as_millis(),
        answer.sources.len()
    );
    Ok(Json(answer))
}
