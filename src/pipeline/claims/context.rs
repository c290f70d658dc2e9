//! Per-request claim context.
//!
//! Carries what the extraction stage found to the decision stage. Owned by
//! one `ClaimProcessor::process` call and dropped when it returns; nothing
//! here outlives the request.

use chrono::NaiveDate;
use uuid::Uuid;

use super::types::{ExtractionRecord, PipelineUnit, Provenance};

/// Output of the extraction stage for one OCR text.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub units: Vec<PipelineUnit>,
}

impl ExtractionOutcome {
    /// Records that passed the quality gate, in extraction order.
    pub fn documents(&self) -> impl Iterator<Item = &ExtractionRecord> {
        self.units.iter().filter_map(|u| u.record.as_ref())
    }
}

/// Elapsed wall time per pipeline phase, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub ocr_ms: u64,
    pub extraction_ms: u64,
    pub decision_ms: u64,
}

#[derive(Debug)]
pub struct ClaimContext {
    pub claim_id: Uuid,
    /// Reference date for future-date validation.
    pub today: NaiveDate,
    pub timings: StageTimings,
    extraction_units: Vec<PipelineUnit>,
}

impl ClaimContext {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            claim_id: Uuid::new_v4(),
            today,
            timings: StageTimings::default(),
            extraction_units: Vec::new(),
        }
    }

    /// Record time already spent on OCR before the context existed.
    pub fn with_ocr_time(mut self, ocr_ms: u64) -> Self {
        self.timings.ocr_ms = ocr_ms;
        self
    }

    pub fn absorb(&mut self, outcome: ExtractionOutcome) {
        self.extraction_units.extend(outcome.units);
    }

    pub fn extraction_units(&self) -> &[PipelineUnit] {
        &self.extraction_units
    }

    /// Every surviving document across all OCR texts.
    pub fn documents(&self) -> Vec<ExtractionRecord> {
        self.extraction_units
            .iter()
            .filter_map(|u| u.record.clone())
            .collect()
    }

    pub fn synthesized_count(&self) -> usize {
        self.extraction_units
            .iter()
            .filter(|u| u.record.is_some() && u.provenance == Provenance::Synthesized)
            .count()
    }

    /// Hand the extraction units over to the aggregator.
    pub fn into_extraction_units(self) -> Vec<PipelineUnit> {
        self.extraction_units
    }
}
