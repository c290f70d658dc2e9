//! Claim decision resolver.
//!
//! Folds every aggregated unit and the surviving documents into the one
//! ClaimResponse the caller sees. Never fails: with no usable decision the
//! claim is rejected.

use std::collections::{BTreeSet, HashSet};

use super::types::*;

pub const NO_DECISION_REASON: &str = "No valid claim decision returned";

/// Derive the final response.
///
/// - Missing kinds come from `documents` only, never from a stage.
/// - Stale "unknown hospital" / "zero amount" discrepancies are dropped when a
///   well-formed bill survived.
/// - Pending decisions are ignored. The first rejection wins; otherwise the
///   first settled decision is final. No settled decision means rejection.
pub fn resolve_claim(units: &[PipelineUnit], documents: &[ExtractionRecord]) -> ClaimResponse {
    let validation = ValidationRecord {
        missing_document_kinds: missing_kinds(documents),
        discrepancies: collect_discrepancies(units, documents),
        ..ValidationRecord::default()
    };

    let settled: Vec<&DecisionRecord> = units
        .iter()
        .map(|u| &u.decision)
        .filter(|d| d.status != DecisionStatus::Pending)
        .collect();

    let claim_decision = match settled.iter().find(|d| d.status == DecisionStatus::Rejected) {
        Some(rejection) => rejection.summary(),
        None => match settled.first() {
            Some(decision) => decision.summary(),
            None => {
                tracing::warn!("No settled decision among pipeline units, rejecting claim");
                DecisionRecord::rejected(NO_DECISION_REASON).summary()
            }
        },
    };

    tracing::info!(
        status = %claim_decision.status,
        documents = documents.len(),
        missing = validation.missing_document_kinds.len(),
        discrepancies = validation.discrepancies.len(),
        "Claim resolved"
    );

    ClaimResponse {
        documents: documents.to_vec(),
        validation,
        claim_decision,
    }
}

fn missing_kinds(documents: &[ExtractionRecord]) -> BTreeSet<DocumentKind> {
    DocumentKind::all()
        .iter()
        .copied()
        .filter(|kind| !documents.iter().any(|d| d.kind() == *kind))
        .collect()
}

fn collect_discrepancies(units: &[PipelineUnit], documents: &[ExtractionRecord]) -> Vec<String> {
    let has_good_bill = documents.iter().any(ExtractionRecord::is_well_formed_bill);
    let mut seen = HashSet::new();

    units
        .iter()
        .flat_map(|u| u.validation.discrepancies.iter())
        .filter(|text| !(has_good_bill && is_stale_bill_discrepancy(text)))
        .filter(|text| seen.insert(text.to_string()))
        .cloned()
        .collect()
}

/// Discrepancies that a well-formed bill makes obsolete.
fn is_stale_bill_discrepancy(text: &str) -> bool {
    let lower = text.to_lowercase();
    let unknown_hospital = lower.contains("hospital") && lower.contains("unknown");
    let zero_amount = lower.contains("amount")
        && (lower.contains("zero") || lower.contains("is 0") || lower.contains("= 0"));
    unknown_hospital || zero_amount
}
