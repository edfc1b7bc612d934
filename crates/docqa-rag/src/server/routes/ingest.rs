//! Document upload endpoints

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::generation::PromptProfile;
use crate::pipeline::Analysis;
use crate::server::state::AppState;
use crate::types::{DocumentFormat, DocumentInput, IngestReport};

/// Multipart field carrying an optional prompt profile name
const PROFILE_FIELD: &str = "profile";

/// Files and options read from a multipart upload
struct Upload {
    documents: Vec<DocumentInput>,
    profile: Option<PromptProfile>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    let mut documents = Vec::new();
    let mut profile = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() == Some(PROFILE_FIELD) {
            let raw = field
                .text()
                .await
                .map_err(|e| Error::InvalidInput(format!("Failed to read profile: {}", e)))?;
            profile = Some(raw.parse::<PromptProfile>().map_err(Error::InvalidInput)?);
            continue;
        }

        let filename = field
            .file_name()
            .or_else(|| field.name())
            .unwrap_or("upload")
            .to_string();
        let format = DocumentFormat::detect(&filename, field.content_type());

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("Failed to read '{}': {}", filename, e)))?;

        tracing::info!("Received file: {} ({} bytes)", filename, data.len());
        documents.push(DocumentInput {
            name: filename,
            format,
            bytes: data.to_vec(),
        });
    }

    if documents.is_empty() {
        return Err(Error::InvalidInput("no files in upload".into()));
    }
    Ok(Upload { documents, profile })
}

/// POST /api/stores/:store/ingest - Rebuild a store from uploaded files
pub async fn ingest_files(
    State(state): State<AppState>,
    Path(store): Path<String>,
    multipart: Multipart,
) -> Result<Json<IngestReport>> {
    let start = Instant::now();
    let upload = read_upload(multipart).await?;

    let report = state.pipeline().ingest(&store, upload.documents).await?;

    tracing::info!(
        "Ingest into '{}' done in {:.1}s: {} chunks",
        store,
        start.elapsed().as_secs_f64(),
        report.chunks_indexed
    );
    Ok(Json(report))
}

/// POST /api/stores/:store/analyze - Ingest a resume and analyse it
pub async fn analyze_files(
    State(state): State<AppState>,
    Path(store): Path<String>,
    multipart: Multipart,
) -> Result<Json<Analysis>> {
    let upload = read_upload(multipart).await?;
    let analysis = state
        .pipeline()
        .analyze(&store, upload.documents, upload.profile)
        .await?;
    Ok(Json(analysis))
}
