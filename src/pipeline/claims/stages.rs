//! Stage drivers: OCR, extraction and decision.
//!
//! Each driver owns the recovery for its external call. A failed OCR or
//! model call degrades to "no data" with a warning and the claim carries on.

use serde_json::{Map, Value};

use super::context::{ClaimContext, ExtractionOutcome};
use super::dates::{future_date_unit, validate_document_dates, DateViolation};
use super::error::ClaimError;
use super::normalizer::normalize_response;
use super::prompt::{decision_prompt, extraction_prompt, DECISION_SYSTEM, EXTRACTION_SYSTEM};
use super::quality::apply_quality_gate;
use super::sanitize::sanitize_json_response;
use super::traits::{OcrService, TextGenerator};
use super::types::*;

pub const NO_DOCUMENTS_REASON: &str = "No high-quality documents found";

/// Characters of OCR text shown in debug logs.
const PREVIEW_CHARS: usize = 80;

// ═══════════════════════════════════════════
// OCR
// ═══════════════════════════════════════════

/// OCR one file. Any failure yields an empty string.
pub fn run_ocr(ocr: &dyn OcrService, file_bytes: &[u8], filename: &str) -> String {
    match ocr.extract_text(file_bytes, filename) {
        Ok(text) => {
            if text.trim().is_empty() {
                tracing::warn!(filename, "OCR returned no text");
            }
            text
        }
        Err(e) => {
            tracing::warn!(filename, error = %e, "OCR failed, continuing without text");
            String::new()
        }
    }
}

// ═══════════════════════════════════════════
// Extraction stage
// ═══════════════════════════════════════════

/// Turn one OCR text into extraction units.
///
/// Records passing the quality gate become one unit each. Model-derived
/// records that fail it are reported through a single discrepancy unit.
pub fn run_extraction_stage(
    generator: &dyn TextGenerator,
    model: &str,
    ocr_text: &str,
) -> ExtractionOutcome {
    if ocr_text.trim().is_empty() {
        tracing::debug!("Empty OCR text, skipping extraction");
        return ExtractionOutcome::default();
    }

    tracing::debug!(
        len = ocr_text.len(),
        preview = %preview(ocr_text),
        "Running extraction"
    );

    let raw = match generator.generate(model, &extraction_prompt(ocr_text), EXTRACTION_SYSTEM) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(model, error = %e, "Extraction call failed, no documents from this text");
            return ExtractionOutcome::default();
        }
    };

    let report = apply_quality_gate(normalize_response(&raw));

    // Stubs that fail the gate were never extracted, so they report nothing.
    let discrepancies: Vec<String> = report
        .rejected
        .iter()
        .filter(|r| r.item.provenance == Provenance::Extracted)
        .flat_map(|r| r.issues.iter().map(|i| i.discrepancy().to_string()))
        .collect();

    let mut units: Vec<PipelineUnit> =
        report.kept.into_iter().map(PipelineUnit::extracted).collect();
    if !discrepancies.is_empty() {
        units.push(PipelineUnit::discrepancies(discrepancies));
    }

    tracing::info!(
        kept = units.iter().filter(|u| u.record.is_some()).count(),
        rejected = report.rejected.len(),
        "Extraction stage complete"
    );

    ExtractionOutcome { units }
}

// ═══════════════════════════════════════════
// Decision stage
// ═══════════════════════════════════════════

/// Produce decision units for the whole claim.
///
/// Short-circuits without a model call when nothing survived extraction or
/// when any document carries a future date. A failed model call yields an
/// empty unit, which the aggregator drops.
pub fn run_decision_stage(
    generator: &dyn TextGenerator,
    model: &str,
    context: &ClaimContext,
) -> Result<Vec<PipelineUnit>, ClaimError> {
    let documents = context.documents();
    if documents.is_empty() {
        tracing::warn!(claim_id = %context.claim_id, "No documents survived extraction");
        return Ok(vec![PipelineUnit::decision(
            ValidationRecord::default(),
            DecisionRecord::rejected(NO_DOCUMENTS_REASON),
        )]);
    }

    let violations: Vec<DateViolation> = documents
        .iter()
        .flat_map(|doc| validate_document_dates(doc, context.today))
        .collect();
    if !violations.is_empty() {
        tracing::warn!(
            claim_id = %context.claim_id,
            violations = violations.len(),
            "Future dates found, skipping decision model"
        );
        return Ok(vec![future_date_unit(&violations)]);
    }

    let documents_json = serde_json::to_string_pretty(&documents)
        .map_err(|e| ClaimError::Processing(format!("cannot encode documents: {e}")))?;
    let prompt = decision_prompt(&documents_json, context.today);

    match generator.generate(model, &prompt, DECISION_SYSTEM) {
        Ok(raw) => Ok(vec![parse_decision_response(&raw)]),
        Err(e) => {
            tracing::warn!(
                claim_id = %context.claim_id,
                model,
                error = %e,
                "Decision call failed"
            );
            Ok(vec![PipelineUnit::empty_decision()])
        }
    }
}

/// Map raw decision-model output onto one decision unit.
///
/// Accepts `{"validation_result": {...}, "claim_decision": {...}}` or a flat
/// object. Either part may arrive as a JSON-encoded string or a list (first
/// element used). Anything unusable gives an empty unit.
pub fn parse_decision_response(raw: &str) -> PipelineUnit {
    let cleaned = sanitize_json_response(raw);
    let value = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            let err = ClaimError::JsonParsing(e.to_string());
            tracing::warn!(error = %err, "Decision output is not valid JSON");
            return PipelineUnit::empty_decision();
        }
    };

    let Some(root) = coerce_object(&value) else {
        tracing::warn!("Decision output has no JSON object");
        return PipelineUnit::empty_decision();
    };

    let validation_fields = root
        .get("validation_result")
        .or_else(|| root.get("validation"))
        .and_then(coerce_object)
        .unwrap_or_else(|| root.clone());

    let decision = match root
        .get("claim_decision")
        .or_else(|| root.get("decision"))
        .and_then(coerce_object)
    {
        Some(fields) => parse_decision(&fields),
        None if root.contains_key("status") => parse_decision(&root),
        None => {
            tracing::warn!("Decision output carries no claim decision");
            DecisionRecord::default()
        }
    };

    PipelineUnit::decision(parse_validation(&validation_fields), decision)
}

/// Objects as-is, lists by their first element, strings by re-parsing.
fn coerce_object(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(fields) => Some(fields.clone()),
        Value::Array(items) => items.first().and_then(coerce_object),
        Value::String(text) => serde_json::from_str::<Value>(&sanitize_json_response(text))
            .ok()
            .filter(|parsed| !parsed.is_string())
            .and_then(|parsed| coerce_object(&parsed)),
        _ => None,
    }
}

fn parse_validation(fields: &Map<String, Value>) -> ValidationRecord {
    ValidationRecord {
        missing_document_kinds: string_list(fields.get("missing_documents"))
            .iter()
            .filter_map(|kind| DocumentKind::from_str(kind))
            .collect(),
        discrepancies: string_list(fields.get("discrepancies")),
        quality_score: score(
            fields
                .get("data_quality_score")
                .or_else(|| fields.get("quality_score")),
        ),
        recommendations: string_list(fields.get("recommendations")),
    }
}

fn parse_decision(fields: &Map<String, Value>) -> DecisionRecord {
    let status = match fields.get("status").and_then(Value::as_str) {
        Some(text) => DecisionStatus::parse(text).unwrap_or_else(|| {
            tracing::warn!(status = text, "Unknown decision status, treating as pending");
            DecisionStatus::Pending
        }),
        None => DecisionStatus::Pending,
    };

    DecisionRecord {
        status,
        reason: fields
            .get("reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        confidence_score: score(
            fields
                .get("confidence_score")
                .or_else(|| fields.get("confidence")),
        ),
        required_actions: string_list(fields.get("required_actions")),
    }
}

/// Non-blank strings from a list (other scalars stringified) or a lone string.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if s.trim().is_empty() => None,
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// 0–100 score from a number or numeric string ("85", "85%").
fn score(value: Option<&Value>) -> Option<u8> {
    let raw = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.clamp(0.0, 100.0).round() as u8)
}

fn preview(text: &str) -> String {
    text.chars()
        .take(PREVIEW_CHARS)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::pipeline::claims::dates::FUTURE_DATE_REASON;
    use crate::pipeline::claims::traits::mocks::{MapOcr, ScriptedGenerator};

    const BILL_AND_SUMMARY: &str = r#"[
        {"type": "bill", "hospital_name": "Apollo", "total_amount": 500.0,
         "date_of_service": "2024-05-30", "patient_name": "Jane Doe"},
        {"type": "discharge_summary", "patient_name": "Jane Doe", "diagnosis": "Flu",
         "admission_date": "2024-05-28", "discharge_date": "2024-05-30",
         "hospital_name": "Apollo"}
    ]"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn context_with(raw_extraction: &str) -> ClaimContext {
        let generator = ScriptedGenerator::new(vec![Ok(raw_extraction)]);
        let mut context = ClaimContext::new(today());
        context.absorb(run_extraction_stage(&generator, "extract", "ocr text"));
        context
    }

    // ── OCR ──────────────────────────────────────────────

    #[test]
    fn ocr_failure_becomes_empty_text() {
        let ocr = MapOcr::new(&[("a.pdf", "[Page 1]\nhello\n\n")]);
        assert_eq!(run_ocr(&ocr, b"%PDF", "a.pdf"), "[Page 1]\nhello\n\n");
        assert_eq!(run_ocr(&ocr, b"%PDF", "missing.pdf"), "");
    }

    // ── Extraction ───────────────────────────────────────

    #[test]
    fn blank_text_skips_model_call() {
        let generator = ScriptedGenerator::new(vec![]);
        let outcome = run_extraction_stage(&generator, "extract", "  \n ");
        assert!(outcome.units.is_empty());
        assert!(generator.calls().is_empty());
    }

    #[test]
    fn model_failure_yields_no_units() {
        let generator = ScriptedGenerator::new(vec![Err("connection refused")]);
        let outcome = run_extraction_stage(&generator, "extract", "some text");
        assert!(outcome.units.is_empty());
    }

    #[test]
    fn surviving_records_become_pending_units() {
        let generator = ScriptedGenerator::new(vec![Ok(BILL_AND_SUMMARY)]);
        let outcome = run_extraction_stage(&generator, "extract", "some text");
        assert_eq!(outcome.units.len(), 2);
        assert!(outcome
            .units
            .iter()
            .all(|u| u.stage == Stage::Extraction && u.decision.status == DecisionStatus::Pending));
        assert_eq!(outcome.documents().count(), 2);
        assert_eq!(generator.calls()[0].0, "extract");
    }

    #[test]
    fn gate_failures_are_reported_as_discrepancies() {
        let raw = r#"[{"type": "bill", "hospital_name": "Unknown Hospital", "total_amount": 0.0}]"#;
        let generator = ScriptedGenerator::new(vec![Ok(raw)]);
        let outcome = run_extraction_stage(&generator, "extract", "some text");
        assert_eq!(outcome.units.len(), 1);
        assert!(outcome.units[0].record.is_none());
        assert_eq!(
            outcome.units[0].validation.discrepancies,
            vec!["Hospital name is unknown", "Total amount is zero"]
        );
    }

    #[test]
    fn synthesized_stub_failing_gate_reports_nothing() {
        let raw = r#"{"type": "discharge_summary", "patient_name": "Jane Doe",
            "hospital_name": "Apollo", "diagnosis": "Flu", "discharge_date": "2024-05-30"}"#;
        let generator = ScriptedGenerator::new(vec![Ok(raw)]);
        let outcome = run_extraction_stage(&generator, "extract", "some text");
        assert_eq!(outcome.units.len(), 1);
        assert_eq!(
            outcome.units[0].record.as_ref().map(ExtractionRecord::kind),
            Some(DocumentKind::DischargeSummary)
        );
    }

    // ── Decision ─────────────────────────────────────────

    #[test]
    fn no_documents_short_circuits() {
        let context = ClaimContext::new(today());
        let generator = ScriptedGenerator::new(vec![]);
        let units = run_decision_stage(&generator, "decide", &context).unwrap();
        assert_eq!(units[0].decision.status, DecisionStatus::Rejected);
        assert_eq!(units[0].decision.reason, NO_DOCUMENTS_REASON);
        assert!(generator.calls().is_empty());
    }

    #[test]
    fn future_date_bypasses_decision_model() {
        let raw = r#"[{"type": "discharge_summary", "patient_name": "Jane Doe",
            "diagnosis": "Flu", "admission_date": "2024-05-28", "discharge_date": "2099-01-01"}]"#;
        let context = context_with(raw);
        let generator = ScriptedGenerator::new(vec![Ok(r#"{"status": "approved"}"#)]);
        let units = run_decision_stage(&generator, "decide", &context).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].decision.reason, FUTURE_DATE_REASON);
        assert_eq!(
            units[0].validation.discrepancies,
            vec!["Future date detected: discharge_date = 2099-01-01"]
        );
        assert!(generator.calls().is_empty());
    }

    #[test]
    fn decision_prompt_carries_all_documents() {
        let context = context_with(BILL_AND_SUMMARY);
        let generator = ScriptedGenerator::new(vec![Ok(
            r#"{"claim_decision": {"status": "approved", "reason": "ok"}}"#,
        )]);
        let units = run_decision_stage(&generator, "decide", &context).unwrap();
        assert_eq!(units[0].decision.status, DecisionStatus::Approved);

        let (model, prompt) = &generator.calls()[0];
        assert_eq!(model, "decide");
        assert!(prompt.contains("\"hospital_name\": \"Apollo\""));
        assert!(prompt.contains("\"diagnosis\": \"Flu\""));
    }

    #[test]
    fn decision_call_failure_yields_empty_unit() {
        let context = context_with(BILL_AND_SUMMARY);
        let generator = ScriptedGenerator::new(vec![Err("timeout")]);
        let units = run_decision_stage(&generator, "decide", &context).unwrap();
        assert!(!units[0].has_signal());
    }

    // ── Decision parsing ─────────────────────────────────

    #[test]
    fn parses_nested_response() {
        let raw = r#"```json
        {
          "validation_result": {
            "missing_documents": [],
            "discrepancies": ["Name mismatch"],
            "data_quality_score": 85,
            "recommendations": ["Verify patient name"]
          },
          "claim_decision": {
            "status": "conditional_approval",
            "reason": "Minor mismatch",
            "confidence_score": "70%",
            "required_actions": ["Submit ID proof"]
          }
        }
        ```"#;
        let unit = parse_decision_response(raw);
        assert_eq!(unit.stage, Stage::Decision);
        assert_eq!(unit.validation.discrepancies, vec!["Name mismatch"]);
        assert_eq!(unit.validation.quality_score, Some(85));
        assert_eq!(unit.decision.status, DecisionStatus::ConditionalApproval);
        assert_eq!(unit.decision.confidence_score, Some(70));
        assert_eq!(unit.decision.required_actions, vec!["Submit ID proof"]);
    }

    #[test]
    fn parses_flat_response() {
        let raw = r#"{"missing_documents": ["bill"], "discrepancies": [],
            "status": "Rejected", "reason": "No bill"}"#;
        let unit = parse_decision_response(raw);
        assert_eq!(unit.decision.status, DecisionStatus::Rejected);
        assert_eq!(unit.decision.reason, "No bill");
        assert!(unit.validation.missing_document_kinds.contains(&DocumentKind::Bill));
    }

    #[test]
    fn decision_as_encoded_string() {
        let raw = r#"{"claim_decision": "{\"status\": \"approved\", \"reason\": \"ok\"}"}"#;
        let unit = parse_decision_response(raw);
        assert_eq!(unit.decision.status, DecisionStatus::Approved);
        assert_eq!(unit.decision.reason, "ok");
    }

    #[test]
    fn decision_as_list_takes_first() {
        let raw = r#"{"claim_decision": [
            {"status": "rejected", "reason": "first"},
            {"status": "approved", "reason": "second"}
        ]}"#;
        let unit = parse_decision_response(raw);
        assert_eq!(unit.decision.reason, "first");
    }

    #[test]
    fn unknown_status_is_pending() {
        let unit = parse_decision_response(r#"{"status": "escalate", "reason": "?"}"#);
        assert_eq!(unit.decision.status, DecisionStatus::Pending);
    }

    #[test]
    fn stray_fences_do_not_lose_decision() {
        let trailing = parse_decision_response("{\"status\": \"approved\", \"reason\": \"ok\"}\n```");
        assert_eq!(trailing.decision.status, DecisionStatus::Approved);

        let inline = parse_decision_response(
            "Result: {\"status\": \"approved\", \"reason\": \"ok\"}\nI formatted it without ```code``` blocks.",
        );
        assert_eq!(inline.decision.status, DecisionStatus::Approved);
        assert_eq!(inline.decision.reason, "ok");
    }

    #[test]
    fn prose_only_response_is_empty() {
        let unit = parse_decision_response("I cannot decide on this claim.");
        assert!(!unit.has_signal());
    }

    #[test]
    fn scores_are_clamped() {
        assert_eq!(score(Some(&serde_json::json!(140))), Some(100));
        assert_eq!(score(Some(&serde_json::json!(-3))), Some(0));
        assert_eq!(score(Some(&serde_json::json!("88.6"))), Some(89));
        assert_eq!(score(Some(&serde_json::json!(true))), None);
        assert_eq!(score(None), None);
    }
}
