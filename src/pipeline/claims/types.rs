//! Core types for the claim pipeline.
//!
//! These types model the lifecycle of a single claim request:
//! OCR text → ExtractionRecord → PipelineUnit (per stage) → ClaimResponse.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════
// Sentinels
// ═══════════════════════════════════════════

/// Placeholder written by the extraction model when a hospital is not found.
pub const UNKNOWN_HOSPITAL: &str = "Unknown Hospital";
/// Placeholder written by the extraction model when a patient is not found.
pub const UNKNOWN_PATIENT: &str = "Unknown Patient";
/// Placeholder used for synthesized discharge summaries.
pub const UNKNOWN_DIAGNOSIS: &str = "Unknown Diagnosis";
/// Placeholder amount for a bill whose total was not found.
pub const SENTINEL_AMOUNT: f64 = 0.0;

/// Placeholder date (2024-01-01) meaning "date not found".
pub fn sentinel_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn is_sentinel_date(date: &NaiveDate) -> bool {
    date.year() == 2024 && date.month() == 1 && date.day() == 1
}

/// A name counts as known when it is non-empty and not the given placeholder.
pub fn is_known_name(value: &str, sentinel: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed != sentinel
}

fn is_known_date(date: Option<&NaiveDate>) -> bool {
    date.is_some_and(|d| !is_sentinel_date(d))
}

// ═══════════════════════════════════════════
// Document Kind
// ═══════════════════════════════════════════

/// The two document kinds a claim needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Bill,
    DischargeSummary,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bill => "bill",
            Self::DischargeSummary => "discharge_summary",
        }
    }

    /// Lenient parse: case, surrounding whitespace, spaces and hyphens are ignored.
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "bill" | "hospital_bill" | "invoice" => Some(Self::Bill),
            "discharge_summary" | "discharge" => Some(Self::DischargeSummary),
            _ => None,
        }
    }

    pub fn all() -> &'static [DocumentKind] {
        &[Self::Bill, Self::DischargeSummary]
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Extraction Records
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillDocument {
    pub hospital_name: String,
    pub total_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_service: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DischargeSummaryDocument {
    pub patient_name: String,
    pub diagnosis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital_name: Option<String>,
}

/// One document extracted from OCR text. Serialized with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractionRecord {
    Bill(BillDocument),
    DischargeSummary(DischargeSummaryDocument),
}

impl ExtractionRecord {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Bill(_) => DocumentKind::Bill,
            Self::DischargeSummary(_) => DocumentKind::DischargeSummary,
        }
    }

    pub fn patient_name(&self) -> Option<&str> {
        match self {
            Self::Bill(bill) => bill.patient_name.as_deref(),
            Self::DischargeSummary(summary) => Some(&summary.patient_name),
        }
    }

    pub fn hospital_name(&self) -> Option<&str> {
        match self {
            Self::Bill(bill) => Some(&bill.hospital_name),
            Self::DischargeSummary(summary) => summary.hospital_name.as_deref(),
        }
    }

    /// Identity used for de-duplication: kind plus (patient, hospital).
    pub fn dedup_key(&self) -> (DocumentKind, String, String) {
        (
            self.kind(),
            self.patient_name().unwrap_or_default().to_string(),
            self.hospital_name().unwrap_or_default().to_string(),
        )
    }

    /// Named dates carried by the record, in field order.
    pub fn dates(&self) -> Vec<(&'static str, NaiveDate)> {
        match self {
            Self::Bill(bill) => bill
                .date_of_service
                .map(|d| ("date_of_service", d))
                .into_iter()
                .collect(),
            Self::DischargeSummary(summary) => [
                ("admission_date", summary.admission_date),
                ("discharge_date", summary.discharge_date),
            ]
            .into_iter()
            .filter_map(|(field, date)| date.map(|d| (field, d)))
            .collect(),
        }
    }

    /// A bill with a real hospital and a positive amount.
    pub fn is_well_formed_bill(&self) -> bool {
        match self {
            Self::Bill(bill) => {
                is_known_name(&bill.hospital_name, UNKNOWN_HOSPITAL) && bill.total_amount > 0.0
            }
            Self::DischargeSummary(_) => false,
        }
    }

    /// Patient, hospital and the relevant date are all real values.
    pub(crate) fn has_known_identity(&self) -> bool {
        match self {
            Self::Bill(bill) => {
                bill.patient_name
                    .as_deref()
                    .is_some_and(|p| is_known_name(p, UNKNOWN_PATIENT))
                    && is_known_name(&bill.hospital_name, UNKNOWN_HOSPITAL)
                    && is_known_date(bill.date_of_service.as_ref())
            }
            Self::DischargeSummary(summary) => {
                is_known_name(&summary.patient_name, UNKNOWN_PATIENT)
                    && summary
                        .hospital_name
                        .as_deref()
                        .is_some_and(|h| is_known_name(h, UNKNOWN_HOSPITAL))
                    && is_known_date(summary.discharge_date.as_ref())
            }
        }
    }
}

/// Whether a record came from the model or was synthesized as a counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Extracted,
    Synthesized,
}

/// Normalizer output: a record plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub record: ExtractionRecord,
    pub provenance: Provenance,
}

impl NormalizedRecord {
    pub fn extracted(record: ExtractionRecord) -> Self {
        Self {
            record,
            provenance: Provenance::Extracted,
        }
    }

    pub fn synthesized(record: ExtractionRecord) -> Self {
        Self {
            record,
            provenance: Provenance::Synthesized,
        }
    }
}

impl AsRef<ExtractionRecord> for NormalizedRecord {
    fn as_ref(&self) -> &ExtractionRecord {
        &self.record
    }
}

impl AsRef<ExtractionRecord> for ExtractionRecord {
    fn as_ref(&self) -> &ExtractionRecord {
        self
    }
}

// ═══════════════════════════════════════════
// Validation & Decision
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    #[serde(rename = "missing_documents", default)]
    pub missing_document_kinds: BTreeSet<DocumentKind>,
    #[serde(default)]
    pub discrepancies: Vec<String>,
    /// 0–100, reported by the decision model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl ValidationRecord {
    pub fn with_discrepancies(discrepancies: Vec<String>) -> Self {
        Self {
            discrepancies,
            ..Self::default()
        }
    }

    /// Carries a real quality score or at least one recommendation.
    pub fn has_signal(&self) -> bool {
        self.quality_score.is_some_and(|s| s > 0) || !self.recommendations.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    #[default]
    Pending,
    Approved,
    ConditionalApproval,
    Rejected,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::ConditionalApproval => "conditional_approval",
            Self::Rejected => "rejected",
        }
    }

    /// Lenient parse of model output ("Approved", "conditional approval", ...).
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "pending" => Some(Self::Pending),
            "approved" | "approve" => Some(Self::Approved),
            "conditional_approval" | "conditionally_approved" | "conditional" => {
                Some(Self::ConditionalApproval)
            }
            "rejected" | "reject" | "denied" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub status: DecisionStatus,
    pub reason: String,
    /// 0–100, reported by the decision model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_actions: Vec<String>,
}

impl DecisionRecord {
    pub fn pending(reason: impl Into<String>) -> Self {
        Self {
            status: DecisionStatus::Pending,
            reason: reason.into(),
            ..Self::default()
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            status: DecisionStatus::Rejected,
            reason: reason.into(),
            confidence_score: Some(0),
            required_actions: Vec::new(),
        }
    }

    /// A settled status, a real confidence, or at least one required action.
    pub fn has_signal(&self) -> bool {
        self.status != DecisionStatus::Pending
            || self.confidence_score.is_some_and(|c| c > 0)
            || !self.required_actions.is_empty()
    }

    /// The two fields the HTTP response exposes.
    pub fn summary(&self) -> Self {
        Self {
            status: self.status,
            reason: self.reason.clone(),
            confidence_score: None,
            required_actions: Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════
// Pipeline Units
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Decision,
}

/// What one stage produced for one record (or for the claim as a whole).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineUnit {
    pub stage: Stage,
    pub record: Option<ExtractionRecord>,
    pub provenance: Provenance,
    pub validation: ValidationRecord,
    pub decision: DecisionRecord,
}

pub const PENDING_DECISION_REASON: &str = "Awaiting claim decision";

impl PipelineUnit {
    /// Extraction-stage unit for a record that passed the quality gate.
    pub fn extracted(record: NormalizedRecord) -> Self {
        Self {
            stage: Stage::Extraction,
            record: Some(record.record),
            provenance: record.provenance,
            validation: ValidationRecord::default(),
            decision: DecisionRecord::pending(PENDING_DECISION_REASON),
        }
    }

    /// Extraction-stage unit that only reports discrepancies.
    pub fn discrepancies(discrepancies: Vec<String>) -> Self {
        Self {
            stage: Stage::Extraction,
            record: None,
            provenance: Provenance::Extracted,
            validation: ValidationRecord::with_discrepancies(discrepancies),
            decision: DecisionRecord::pending(PENDING_DECISION_REASON),
        }
    }

    /// Decision-stage unit. Never carries a record.
    pub fn decision(validation: ValidationRecord, decision: DecisionRecord) -> Self {
        Self {
            stage: Stage::Decision,
            record: None,
            provenance: Provenance::Extracted,
            validation,
            decision,
        }
    }

    /// Decision-stage unit with nothing in it. Dropped by the aggregator.
    pub fn empty_decision() -> Self {
        Self::decision(ValidationRecord::default(), DecisionRecord::default())
    }

    pub fn has_signal(&self) -> bool {
        self.validation.has_signal() || self.decision.has_signal()
    }
}

// ═══════════════════════════════════════════
// Claim Response
// ═══════════════════════════════════════════

/// The single result returned for a claim request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub documents: Vec<ExtractionRecord>,
    pub validation: ValidationRecord,
    pub claim_decision: DecisionRecord,
}
