//! Claim processing endpoint.
//!
//! `POST /process-claim`: multipart upload of one or more PDFs under the
//! `files` field. The pipeline blocks on OCR and model calls, so it runs on
//! the blocking pool in a span tagged with the request id.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, RequestId};
use crate::pipeline::claims::ClaimResponse;

/// Multipart field carrying the uploaded documents.
pub const FILES_FIELD: &str = "files";

pub async fn process_claim(
    State(ctx): State<ApiContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    mut multipart: Multipart,
) -> Result<Json<ClaimResponse>, ApiError> {
    let mut files = Vec::new();
    let mut filenames = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?;
        files.push(bytes.to_vec());
        filenames.push(filename);
    }

    tracing::info!(files = files.len(), %request_id, "Claim upload received");

    let processor = Arc::clone(&ctx.processor);
    let span = tracing::info_span!("claim_worker", %request_id);
    let response = tokio::task::spawn_blocking(move || {
        span.in_scope(|| processor.process_files(files, filenames))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("claim worker failed: {e}")))??;

    Ok(Json(response))
}
