//! HTTP middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Request id: tags the request span and echoes `X-Request-ID`
//! 2. Rate limiter: per client address, rejects before any upload is read

pub mod rate;
pub mod request_id;
