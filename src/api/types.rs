//! Shared types for the HTTP layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::pipeline::claims::ClaimProcessor;

/// Default request budget per client per minute.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

const WINDOW: Duration = Duration::from_secs(60);

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub processor: Arc<ClaimProcessor>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    /// Largest request body accepted on upload routes.
    pub max_body_bytes: usize,
}

impl ApiContext {
    pub fn new(processor: Arc<ClaimProcessor>, max_body_bytes: usize) -> Self {
        Self {
            processor,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_REQUESTS_PER_MINUTE))),
            max_body_bytes,
        }
    }

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limiter = Arc::new(Mutex::new(RateLimiter::new(per_minute)));
        self
    }
}

/// Request id assigned by the request-id middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

// ═══════════════════════════════════════════════════════════
// Rate limiter: sliding one-minute window per client
// ═══════════════════════════════════════════════════════════

pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
}

impl RateLimiter {
    pub fn new(per_minute: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
        }
    }

    /// `Ok(())` if the client may proceed, otherwise `Err(retry_after_secs)`.
    pub fn check(&mut self, client: &str) -> Result<(), u64> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&mut self, client: &str, now: Instant) -> Result<(), u64> {
        // Expire old timestamps everywhere and forget idle clients.
        self.windows.retain(|_, entries| {
            entries.retain(|ts| now.duration_since(*ts) < WINDOW);
            !entries.is_empty()
        });

        let entries = self.windows.entry(client.to_string()).or_default();

        if entries.len() as u32 >= self.per_minute {
            let oldest = entries.first().copied().unwrap_or(now);
            let waited = now.duration_since(oldest).as_secs();
            return Err(WINDOW.as_secs().saturating_sub(waited).max(1));
        }

        entries.push(now);
        Ok(())
    }

    /// Clients with at least one request inside the current window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE)
    }
}
