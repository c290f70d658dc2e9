//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub extraction_model: String,
    pub decision_model: String,
}

/// `GET /health`: liveness plus the models claims are routed to.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let settings = ctx.processor.settings();

    Ok(Json(HealthResponse {
        status: "ok",
        service: crate::config::APP_NAME,
        version: crate::config::APP_VERSION,
        extraction_model: settings.extraction_model.clone(),
        decision_model: settings.decision_model.clone(),
    }))
}
