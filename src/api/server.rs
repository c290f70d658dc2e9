//! API server lifecycle. Starts and stops the axum HTTP server.
//!
//! bind → spawn background task → return handle with shutdown channel.
//! Connections carry their peer address so the rate limiter can key on it.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::router::claims_router;
use crate::api::types::ApiContext;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

/// Session metadata for a running API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSession {
    pub session_id: String,
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a running API server.
pub struct ApiServer {
    pub session: ApiSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait until the server task has exited.
    pub async fn stopped(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("API server task failed: {e}");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Bind `addr`, mount `claims_router`, and serve in a background task.
pub async fn start_api_server(ctx: ApiContext, addr: SocketAddr) -> Result<ApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = claims_router(ctx);

    let session = ApiSession {
        session_id: Uuid::new_v4().to_string(),
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        session,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::claims::traits::mocks::{MapOcr, ScriptedGenerator};
    use crate::pipeline::claims::{ClaimProcessor, ProcessorSettings, UploadLimits};

    fn test_ctx() -> ApiContext {
        let processor = ClaimProcessor::new(
            Box::new(MapOcr::new(&[])),
            Box::new(ScriptedGenerator::new(vec![])),
            ProcessorSettings {
                extraction_model: "extract".into(),
                decision_model: "decide".into(),
                limits: UploadLimits::new(10, 50),
            },
        );
        ApiContext::new(Arc::new(processor), 1024 * 1024)
    }

    fn loopback() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    #[tokio::test]
    async fn start_serve_and_stop() {
        let mut server = start_api_server(test_ctx(), loopback())
            .await
            .expect("server should start");

        assert!(server.session.port > 0);
        assert!(!server.session.session_id.is_empty());

        let url = format!("http://127.0.0.1:{}/health", server.session.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert!(resp.status().is_success());
        assert!(resp.headers().get("x-request-id").is_some());

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn rate_limit_is_keyed_by_peer() {
        let ctx = test_ctx().with_rate_limit(1);
        let mut server = start_api_server(ctx, loopback()).await.unwrap();
        let url = format!("http://127.0.0.1:{}/health", server.session.port);

        assert!(reqwest::get(&url).await.unwrap().status().is_success());
        assert_eq!(reqwest::get(&url).await.unwrap().status().as_u16(), 429);

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let first = start_api_server(test_ctx(), loopback()).await.unwrap();
        let taken = SocketAddr::from((Ipv4Addr::LOCALHOST, first.session.port));
        let err = start_api_server(test_ctx(), taken).await.err().unwrap();
        assert!(err.contains("Failed to bind"));
    }
}
