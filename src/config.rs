use std::net::SocketAddr;

use crate::pipeline::claims::{ProcessorSettings, UploadLimits};

/// Application-level constants
pub const APP_NAME: &str = "HealthPay";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_LLM_URL: &str = "http://localhost:11434";
pub const DEFAULT_EXTRACTION_MODEL: &str = "llama3.1:8b";
pub const DEFAULT_DECISION_MODEL: &str = "llama3.1:8b";
pub const DEFAULT_OCR_URL: &str = "https://api.mistral.ai/v1/ocr";
pub const DEFAULT_OCR_MODEL: &str = "mistral-ocr-latest";
pub const DEFAULT_MAX_FILE_SIZE_MB: usize = 50;
pub const DEFAULT_MAX_FILES: usize = 10;
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

/// Filter used when `RUST_LOG` is unset or invalid.
pub fn default_log_filter() -> &'static str {
    "healthpay_lib=info,tower_http=info,warn"
}

/// Runtime configuration, read from `HEALTHPAY_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub llm_url: String,
    pub extraction_model: String,
    pub decision_model: String,
    pub ocr_url: String,
    pub ocr_api_key: Option<String>,
    pub ocr_model: String,
    pub max_file_size_mb: usize,
    pub max_files: usize,
    pub ocr_timeout_secs: u64,
    pub llm_timeout_secs: u64,
    /// Requests allowed per client address per minute.
    pub rate_limit_per_minute: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. Bad values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            bind_addr: parsed(&lookup, "HEALTHPAY_BIND_ADDR", default_bind_addr()),
            llm_url: text("HEALTHPAY_LLM_URL", DEFAULT_LLM_URL),
            extraction_model: text("HEALTHPAY_EXTRACTION_MODEL", DEFAULT_EXTRACTION_MODEL),
            decision_model: text("HEALTHPAY_DECISION_MODEL", DEFAULT_DECISION_MODEL),
            ocr_url: text("HEALTHPAY_OCR_URL", DEFAULT_OCR_URL),
            ocr_api_key: lookup("HEALTHPAY_OCR_API_KEY").filter(|k| !k.trim().is_empty()),
            ocr_model: text("HEALTHPAY_OCR_MODEL", DEFAULT_OCR_MODEL),
            max_file_size_mb: parsed(&lookup, "HEALTHPAY_MAX_FILE_SIZE_MB", DEFAULT_MAX_FILE_SIZE_MB),
            max_files: parsed(&lookup, "HEALTHPAY_MAX_FILES", DEFAULT_MAX_FILES),
            ocr_timeout_secs: parsed(&lookup, "HEALTHPAY_OCR_TIMEOUT_SECS", DEFAULT_OCR_TIMEOUT_SECS),
            llm_timeout_secs: parsed(&lookup, "HEALTHPAY_LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS),
            rate_limit_per_minute: parsed(
                &lookup,
                "HEALTHPAY_RATE_LIMIT_PER_MINUTE",
                DEFAULT_RATE_LIMIT_PER_MINUTE,
            )
            .max(1),
        }
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits::new(self.max_files, self.max_file_size_mb)
    }

    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            extraction_model: self.extraction_model.clone(),
            decision_model: self.decision_model.clone(),
            limits: self.upload_limits(),
        }
    }

    /// Largest multipart body the HTTP layer accepts.
    pub fn max_body_bytes(&self) -> usize {
        self.max_files
            .saturating_mul(self.max_file_size_mb)
            .saturating_mul(1024 * 1024)
            .saturating_add(1024 * 1024)
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
                default
            }
        },
    }
}
