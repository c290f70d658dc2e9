//! ClaimProcessor: orchestrates one claim request end to end.
//!
//! Files → OCR → extraction stage → date check → decision stage →
//! aggregator → resolver. OCR runs one thread per file; everything after
//! OCR is sequential over already-fetched text.

use std::time::Instant;

use chrono::NaiveDate;

use super::aggregator::aggregate_units;
use super::context::ClaimContext;
use super::error::ClaimError;
use super::files::{pair_uploads, validate_uploads, UploadLimits, UploadedFile};
use super::resolver::resolve_claim;
use super::stages::{run_decision_stage, run_extraction_stage, run_ocr};
use super::traits::{OcrService, TextGenerator};
use super::types::ClaimResponse;

/// Models and limits the processor runs with.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub extraction_model: String,
    pub decision_model: String,
    pub limits: UploadLimits,
}

pub struct ClaimProcessor {
    ocr: Box<dyn OcrService>,
    generator: Box<dyn TextGenerator>,
    settings: ProcessorSettings,
}

impl ClaimProcessor {
    pub fn new(
        ocr: Box<dyn OcrService>,
        generator: Box<dyn TextGenerator>,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            ocr,
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    /// Validate uploads, OCR them, then run the claim pipeline.
    pub fn process_files(
        &self,
        files: Vec<Vec<u8>>,
        filenames: Vec<String>,
    ) -> Result<ClaimResponse, ClaimError> {
        let uploads = pair_uploads(files, filenames)?;
        validate_uploads(&uploads, &self.settings.limits)?;

        let start = Instant::now();
        let ocr_texts = self.ocr_all(&uploads);
        let ocr_ms = start.elapsed().as_millis() as u64;
        tracing::info!(files = uploads.len(), ocr_ms, "OCR complete");

        self.run_claim(&ocr_texts, today(), ocr_ms)
    }

    /// Run the claim pipeline over already-extracted OCR texts.
    pub fn process(&self, ocr_texts: &[String]) -> Result<ClaimResponse, ClaimError> {
        self.process_on(ocr_texts, today())
    }

    /// Same as [`process`](Self::process) with an explicit reference date.
    pub fn process_on(
        &self,
        ocr_texts: &[String],
        today: NaiveDate,
    ) -> Result<ClaimResponse, ClaimError> {
        self.run_claim(ocr_texts, today, 0)
    }

    fn run_claim(
        &self,
        ocr_texts: &[String],
        today: NaiveDate,
        ocr_ms: u64,
    ) -> Result<ClaimResponse, ClaimError> {
        let start = Instant::now();
        let mut context = ClaimContext::new(today).with_ocr_time(ocr_ms);
        let span = tracing::info_span!("claim", claim_id = %context.claim_id);
        let _guard = span.enter();

        let extraction_start = Instant::now();
        for text in ocr_texts {
            let outcome =
                run_extraction_stage(self.generator.as_ref(), &self.settings.extraction_model, text);
            context.absorb(outcome);
        }
        context.timings.extraction_ms = extraction_start.elapsed().as_millis() as u64;

        let decision_start = Instant::now();
        let decision_units =
            run_decision_stage(self.generator.as_ref(), &self.settings.decision_model, &context)
                .map_err(|e| {
                    tracing::error!(error = %e, "Decision stage failed");
                    match e {
                        ClaimError::InvalidRequest(_) | ClaimError::Processing(_) => e,
                        other => ClaimError::Processing(other.to_string()),
                    }
                })?;
        context.timings.decision_ms = decision_start.elapsed().as_millis() as u64;

        let documents = context.documents();
        let synthesized = context.synthesized_count();
        let timings = context.timings;
        let units = aggregate_units(context.into_extraction_units(), decision_units);
        let response = resolve_claim(&units, &documents);

        tracing::info!(
            texts = ocr_texts.len(),
            documents = documents.len(),
            synthesized,
            status = %response.claim_decision.status,
            ocr_ms = timings.ocr_ms,
            extraction_ms = timings.extraction_ms,
            decision_ms = timings.decision_ms,
            total_ms = timings.ocr_ms + start.elapsed().as_millis() as u64,
            "Claim processed"
        );

        Ok(response)
    }

    /// OCR every upload concurrently, preserving upload order.
    fn ocr_all(&self, uploads: &[UploadedFile]) -> Vec<String> {
        let ocr = self.ocr.as_ref();
        std::thread::scope(|scope| {
            let handles: Vec<_> = uploads
                .iter()
                .map(|file| scope.spawn(move || run_ocr(ocr, &file.content, &file.filename)))
                .collect();
            handles
                .into_iter()
                .zip(uploads)
                .map(|(handle, file)| {
                    handle.join().unwrap_or_else(|_| {
                        tracing::warn!(filename = %file.filename, "OCR worker panicked");
                        String::new()
                    })
                })
                .collect()
        })
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
