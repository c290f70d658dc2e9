//! HTTP API for claim processing.
//!
//! `POST /process-claim` accepts multipart PDF uploads and returns the
//! resolved claim. `GET /health` reports liveness. Routes are protected
//! by a middleware stack: Request id → Rate limit → Handler.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::claims_router;
pub use server::{start_api_server, ApiServer, ApiSession};
pub use types::ApiContext;
