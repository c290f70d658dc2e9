//! Date validator: a real claim cannot carry a date after today.

use chrono::NaiveDate;

use super::types::{
    DecisionRecord, DocumentKind, ExtractionRecord, PipelineUnit, ValidationRecord,
};

pub const FUTURE_DATE_REASON: &str =
    "Claim contains future date(s), which is not allowed for real claims";
pub const FUTURE_DATE_RECOMMENDATION: &str =
    "Correct all future dates to valid past or present dates";

/// One date field that lies in the future.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateViolation {
    pub kind: DocumentKind,
    pub field: &'static str,
    pub date: NaiveDate,
}

impl DateViolation {
    pub fn discrepancy(&self) -> String {
        format!("Future date detected: {} = {}", self.field, self.date)
    }
}

/// Every date on `record` strictly after `today`. Today itself is valid.
pub fn validate_document_dates(record: &ExtractionRecord, today: NaiveDate) -> Vec<DateViolation> {
    record
        .dates()
        .into_iter()
        .filter(|(_, date)| *date > today)
        .map(|(field, date)| DateViolation {
            kind: record.kind(),
            field,
            date,
        })
        .collect()
}

/// Decision-stage unit that rejects the claim because of future dates.
pub fn future_date_unit(violations: &[DateViolation]) -> PipelineUnit {
    let validation = ValidationRecord {
        discrepancies: violations.iter().map(DateViolation::discrepancy).collect(),
        recommendations: vec![FUTURE_DATE_RECOMMENDATION.to_string()],
        ..ValidationRecord::default()
    };
    PipelineUnit::decision(validation, DecisionRecord::rejected(FUTURE_DATE_REASON))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::claims::types::{BillDocument, DecisionStatus, DischargeSummaryDocument};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn summary(admitted: &str, discharged: &str) -> ExtractionRecord {
        ExtractionRecord::DischargeSummary(DischargeSummaryDocument {
            patient_name: "Jane".into(),
            diagnosis: "Fracture".into(),
            admission_date: Some(date(admitted)),
            discharge_date: Some(date(discharged)),
            hospital_name: None,
        })
    }

    #[test]
    fn today_is_not_a_violation() {
        let today = date("2024-06-01");
        assert!(validate_document_dates(&summary("2024-05-28", "2024-06-01"), today).is_empty());
    }

    #[test]
    fn tomorrow_is_a_violation() {
        let today = date("2024-06-01");
        let violations = validate_document_dates(&summary("2024-05-28", "2024-06-02"), today);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "discharge_date");
        assert_eq!(
            violations[0].discrepancy(),
            "Future date detected: discharge_date = 2024-06-02"
        );
    }

    #[test]
    fn every_future_field_is_reported() {
        let today = date("2024-06-01");
        let violations = validate_document_dates(&summary("2024-07-01", "2024-07-05"), today);
        let fields: Vec<_> = violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["admission_date", "discharge_date"]);
    }

    #[test]
    fn absent_dates_are_ignored() {
        let bill = ExtractionRecord::Bill(BillDocument {
            hospital_name: "City".into(),
            total_amount: 10.0,
            date_of_service: None,
            patient_name: None,
        });
        assert!(validate_document_dates(&bill, date("2000-01-01")).is_empty());
    }

    #[test]
    fn future_date_unit_rejects_with_zero_confidence() {
        let violations = validate_document_dates(
            &summary("2024-05-01", "2024-07-05"),
            date("2024-06-01"),
        );
        let unit = future_date_unit(&violations);
        assert_eq!(unit.decision.status, DecisionStatus::Rejected);
        assert_eq!(unit.decision.reason, FUTURE_DATE_REASON);
        assert_eq!(unit.decision.confidence_score, Some(0));
        assert_eq!(unit.validation.recommendations, vec![FUTURE_DATE_RECOMMENDATION]);
        assert!(unit.record.is_none());
    }
}
