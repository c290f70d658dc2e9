//! Quality gate: drop records whose identifying fields are placeholders.
//!
//! Bills need a real hospital and a positive amount. Discharge summaries need
//! a real patient. Rejected records are reported, not silently lost.

use super::types::{
    is_known_name, ExtractionRecord, UNKNOWN_HOSPITAL, UNKNOWN_PATIENT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityIssue {
    UnknownHospital,
    ZeroAmount,
    UnknownPatient,
}

impl QualityIssue {
    /// Discrepancy text reported for this issue.
    pub fn discrepancy(&self) -> &'static str {
        match self {
            Self::UnknownHospital => "Hospital name is unknown",
            Self::ZeroAmount => "Total amount is zero",
            Self::UnknownPatient => "Patient name is unknown",
        }
    }
}

/// A record that failed the gate, with every reason it failed.
#[derive(Debug, Clone)]
pub struct RejectedRecord<T> {
    pub item: T,
    pub issues: Vec<QualityIssue>,
}

#[derive(Debug, Clone)]
pub struct QualityReport<T> {
    pub kept: Vec<T>,
    pub rejected: Vec<RejectedRecord<T>>,
}

impl<T> QualityReport<T> {
    /// Discrepancy strings for every rejected record, in input order.
    pub fn discrepancies(&self) -> Vec<String> {
        self.rejected
            .iter()
            .flat_map(|r| r.issues.iter().map(|i| i.discrepancy().to_string()))
            .collect()
    }
}

/// Everything wrong with a record. Empty means it passes.
pub fn quality_issues(record: &ExtractionRecord) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    match record {
        ExtractionRecord::Bill(bill) => {
            if !is_known_name(&bill.hospital_name, UNKNOWN_HOSPITAL) {
                issues.push(QualityIssue::UnknownHospital);
            }
            if bill.total_amount <= 0.0 {
                issues.push(QualityIssue::ZeroAmount);
            }
        }
        ExtractionRecord::DischargeSummary(summary) => {
            if !is_known_name(&summary.patient_name, UNKNOWN_PATIENT) {
                issues.push(QualityIssue::UnknownPatient);
            }
        }
    }
    issues
}

/// Partition records into kept and rejected. Kept order follows input order.
pub fn apply_quality_gate<T: AsRef<ExtractionRecord>>(items: Vec<T>) -> QualityReport<T> {
    let mut kept = Vec::new();
    let mut rejected = Vec::new();

    for item in items {
        let issues = quality_issues(item.as_ref());
        if issues.is_empty() {
            kept.push(item);
        } else {
            tracing::debug!(
                kind = %item.as_ref().kind(),
                issues = issues.len(),
                "Record failed quality gate"
            );
            rejected.push(RejectedRecord { item, issues });
        }
    }

    QualityReport { kept, rejected }
}
