//! HTTP router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//!
//! Middleware stack (outermost → innermost):
//! 1. Request id → 2. Rate limiter → Handler

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the claims API router.
///
/// Middleware uses `Extension<ApiContext>` (injected outside the rate limiter).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn claims_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.max_body_bytes;

    Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/process-claim",
            post(endpoints::claims::process_claim).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(ctx.clone())
        // Innermost first, outermost last
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx))
        .layer(axum::middleware::from_fn(middleware::request_id::assign))
        .layer(CorsLayer::permissive())
}
