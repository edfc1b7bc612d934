//! API routes for the document QA server

pub mod ingest;
pub mod query;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Uploads get the larger body limit
        .route(
            "/stores/:store/ingest",
            post(ingest::ingest_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route(
            "/stores/:store/analyze",
            post(ingest::analyze_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/stores/:store/ask", post(query::ask))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(serde_json::json!({
        "name": "docqa-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over uploaded documents",
        "uptime_secs": state.uptime_secs(),
        "endpoints": {
            "POST /api/stores/:store/ingest": "Upload documents and rebuild the store",
            "POST /api/stores/:store/ask": "Answer a question from the store",
            "POST /api/stores/:store/analyze": "Upload a resume and analyse it",
            "GET /api/info": "This document"
        },
        "settings": {
            "embedding_model": config.embeddings.model,
            "embedding_dimensions": config.embeddings.dimensions,
            "composer_model": config.composer.model,
            "prompt_profile": config.composer.profile.to_string(),
            "chunk_size": config.chunking.chunk_size,
            "chunk_overlap": config.chunking.chunk_overlap,
            "top_k": config.retrieval.top_k,
            "metric": config.index.metric.as_str()
        }
    }))
}
