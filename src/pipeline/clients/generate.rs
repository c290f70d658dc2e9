use serde::{Deserialize, Serialize};

use crate::pipeline::claims::{ClaimError, TextGenerator};

/// Ollama-compatible HTTP text generator (`POST /api/generate`).
pub struct OllamaGenerator {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaGenerator {
    /// Create a generator pointing at an Ollama-compatible server.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ClaimError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClaimError::Generation(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Request body for /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

/// Response body from /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl TextGenerator for OllamaGenerator {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, ClaimError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                ClaimError::Generation(format!("model server is not running at {}", self.base_url))
            } else if e.is_timeout() {
                ClaimError::Generation(format!("request timed out after {}s", self.timeout_secs))
            } else {
                ClaimError::Generation(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClaimError::Generation(format!(
                "model server returned status {}: {body}",
                status.as_u16()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ClaimError::Generation(format!("unreadable model response: {e}")))?;

        tracing::debug!(model, len = parsed.response.len(), "Model response received");
        Ok(parsed.response)
    }
}
