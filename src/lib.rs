pub mod api;
pub mod config;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{start_api_server, ApiContext};
use crate::config::AppConfig;
use crate::pipeline::claims::ClaimProcessor;
use crate::pipeline::clients::{HttpOcrService, OllamaGenerator};

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env();
    if let Err(e) = serve(&config) {
        tracing::error!(error = %e, "Server exited with error");
        std::process::exit(1);
    }
}

/// Build the processor, then serve until Ctrl-C.
///
/// The blocking HTTP clients inside the processor must not be created or
/// dropped on a runtime thread, so the processor outlives the runtime.
fn serve(config: &AppConfig) -> Result<(), String> {
    if config.ocr_api_key.is_none() {
        tracing::warn!("HEALTHPAY_OCR_API_KEY is not set; OCR requests will be unauthenticated");
    }

    let processor = Arc::new(build_processor(config).map_err(|e| e.to_string())?);
    tracing::info!(
        llm_url = %config.llm_url,
        extraction_model = %config.extraction_model,
        decision_model = %config.decision_model,
        ocr_url = %config.ocr_url,
        max_files = config.max_files,
        max_file_size_mb = config.max_file_size_mb,
        "Claim processor ready"
    );

    let ctx = ApiContext::new(Arc::clone(&processor), config.max_body_bytes())
        .with_rate_limit(config.rate_limit_per_minute);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;

    let result = runtime.block_on(async {
        let mut server = start_api_server(ctx, config.bind_addr).await?;
        tracing::info!(addr = %server.session.server_addr, "Listening");

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {e}");
        }
        server.shutdown();
        server.stopped().await;
        Ok::<(), String>(())
    });

    drop(runtime);
    drop(processor);
    result
}

fn build_processor(config: &AppConfig) -> Result<ClaimProcessor, pipeline::claims::ClaimError> {
    let ocr = HttpOcrService::new(
        &config.ocr_url,
        config.ocr_api_key.clone(),
        &config.ocr_model,
        config.ocr_timeout_secs,
    )?;
    let generator = OllamaGenerator::new(&config.llm_url, config.llm_timeout_secs)?;

    Ok(ClaimProcessor::new(
        Box::new(ocr),
        Box::new(generator),
        config.processor_settings(),
    ))
}
