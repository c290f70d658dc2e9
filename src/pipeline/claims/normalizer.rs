//! Document normalizer: raw extraction-model output → typed records.
//!
//! Accepts a single object or an array of objects, coerces loosely-typed
//! fields, drops malformed entries, de-duplicates, and synthesizes a
//! counterpart when exactly one document survives.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};

use super::error::ClaimError;
use super::sanitize::sanitize_json_response;
use super::types::*;

/// First number in a free-form amount ("Rs. 12,500.00", "$ 99").
static AMOUNT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?").expect("valid regex"));

/// Lazy spans used to salvage a payload that failed to parse as a whole.
static RECOVERY_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[\s\S]*?\]|\{[\s\S]*?\}").expect("valid regex"));

/// Sanitize, parse and normalize raw extraction output.
/// Never fails: unusable input yields an empty list.
pub fn normalize_response(raw: &str) -> Vec<NormalizedRecord> {
    let cleaned = sanitize_json_response(raw);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => normalize_documents(&value),
        Err(e) => {
            let err = ClaimError::JsonParsing(e.to_string());
            tracing::warn!(error = %err, "Extraction output is not valid JSON, attempting recovery");
            match recover_documents(raw) {
                Some(value) => normalize_documents(&value),
                None => {
                    tracing::warn!("No document JSON could be recovered from extraction output");
                    Vec::new()
                }
            }
        }
    }
}

/// Normalize an already-parsed value (object or array of objects).
pub fn normalize_documents(value: &Value) -> Vec<NormalizedRecord> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![value],
        other => {
            tracing::warn!(kind = json_kind(other), "Extraction output is neither object nor array");
            return Vec::new();
        }
    };

    let records: Vec<ExtractionRecord> = items
        .into_iter()
        .filter_map(|item| match parse_record(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::error!(error = %e, payload = %item, "Dropping malformed extraction record");
                None
            }
        })
        .collect();

    let records = deduplicate(records);
    let mut normalized: Vec<NormalizedRecord> =
        records.into_iter().map(NormalizedRecord::extracted).collect();

    let counterpart = match normalized.as_slice() {
        [only] => synthesize_counterpart(&only.record),
        _ => None,
    };
    if let Some(counterpart) = counterpart {
        tracing::info!(
            kind = %counterpart.kind(),
            "Synthesized counterpart for single extracted document"
        );
        normalized.push(NormalizedRecord::synthesized(counterpart));
    }

    normalized
}

/// Keep the first record for each (kind, patient, hospital). Order is preserved.
pub fn deduplicate(records: Vec<ExtractionRecord>) -> Vec<ExtractionRecord> {
    let mut seen = HashSet::new();
    let before = records.len();
    let unique: Vec<ExtractionRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.dedup_key()))
        .collect();
    if unique.len() < before {
        tracing::debug!(dropped = before - unique.len(), "Removed duplicate documents");
    }
    unique
}

/// Build the missing half of a bill/discharge-summary pair.
///
/// Only when patient, hospital and the relevant date are real values.
/// Fields with no source get sentinels.
pub fn synthesize_counterpart(record: &ExtractionRecord) -> Option<ExtractionRecord> {
    if !record.has_known_identity() {
        return None;
    }
    match record {
        ExtractionRecord::Bill(bill) => {
            Some(ExtractionRecord::DischargeSummary(DischargeSummaryDocument {
                patient_name: bill.patient_name.clone()?,
                diagnosis: UNKNOWN_DIAGNOSIS.to_string(),
                admission_date: Some(sentinel_date()),
                discharge_date: bill.date_of_service,
                hospital_name: Some(bill.hospital_name.clone()),
            }))
        }
        ExtractionRecord::DischargeSummary(summary) => Some(ExtractionRecord::Bill(BillDocument {
            hospital_name: summary.hospital_name.clone()?,
            total_amount: SENTINEL_AMOUNT,
            date_of_service: summary.discharge_date,
            patient_name: Some(summary.patient_name.clone()),
        })),
    }
}

/// First span of the raw text that parses as an object or array of objects.
fn recover_documents(raw: &str) -> Option<Value> {
    RECOVERY_SPAN
        .find_iter(raw)
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .find(|value| match value {
            Value::Object(_) => true,
            Value::Array(items) => !items.is_empty() && items.iter().all(Value::is_object),
            _ => false,
        })
}

// ═══════════════════════════════════════════
// Field coercion
// ═══════════════════════════════════════════

fn parse_record(item: &Value) -> Result<ExtractionRecord, ClaimError> {
    let fields = item.as_object().ok_or_else(|| {
        ClaimError::Structure(format!("expected object, got {}", json_kind(item)))
    })?;

    let kind_text = match text_field(fields, "type")? {
        Some(kind) => kind,
        None => text_field(fields, "kind")?
            .ok_or_else(|| ClaimError::Structure("missing document type".into()))?,
    };
    let kind = DocumentKind::from_str(&kind_text)
        .ok_or_else(|| ClaimError::Structure(format!("unknown document type: {kind_text}")))?;

    let record = match kind {
        DocumentKind::Bill => ExtractionRecord::Bill(BillDocument {
            hospital_name: text_field(fields, "hospital_name")?
                .unwrap_or_else(|| UNKNOWN_HOSPITAL.to_string()),
            total_amount: amount_field(fields, "total_amount")?.unwrap_or(SENTINEL_AMOUNT),
            date_of_service: date_field(fields, "date_of_service")?,
            patient_name: text_field(fields, "patient_name")?,
        }),
        DocumentKind::DischargeSummary => {
            ExtractionRecord::DischargeSummary(DischargeSummaryDocument {
                patient_name: text_field(fields, "patient_name")?
                    .unwrap_or_else(|| UNKNOWN_PATIENT.to_string()),
                diagnosis: text_field(fields, "diagnosis")?
                    .unwrap_or_else(|| UNKNOWN_DIAGNOSIS.to_string()),
                admission_date: date_field(fields, "admission_date")?,
                discharge_date: date_field(fields, "discharge_date")?,
                hospital_name: text_field(fields, "hospital_name")?,
            })
        }
    };
    Ok(record)
}

/// Trimmed string; scalars are stringified, blanks count as absent.
fn text_field(fields: &Map<String, Value>, key: &str) -> Result<Option<String>, ClaimError> {
    let text = match fields.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => {
            return Err(ClaimError::Structure(format!(
                "{key} must be text, got {}",
                json_kind(other)
            )))
        }
    };
    Ok((!text.is_empty()).then_some(text))
}

/// Non-negative amount from a number or a numeric string.
fn amount_field(fields: &Map<String, Value>, key: &str) -> Result<Option<f64>, ClaimError> {
    let amount = match fields.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ClaimError::Structure(format!("{key} is not a finite number")))?,
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => {
            let number = AMOUNT_NUMBER.find(s).ok_or_else(|| {
                ClaimError::Structure(format!("{key} has no numeric value: {s}"))
            })?;
            number
                .as_str()
                .replace(',', "")
                .parse::<f64>()
                .map_err(|e| ClaimError::Structure(format!("{key}: {e}")))?
        }
        Some(other) => {
            return Err(ClaimError::Structure(format!(
                "{key} must be a number, got {}",
                json_kind(other)
            )))
        }
    };

    if amount < 0.0 {
        return Err(ClaimError::Structure(format!("{key} is negative: {amount}")));
    }
    Ok(Some(amount))
}

/// ISO `YYYY-MM-DD`. A trailing time part is ignored; "unknown" counts as absent.
fn date_field(fields: &Map<String, Value>, key: &str) -> Result<Option<NaiveDate>, ClaimError> {
    let text = match fields.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim(),
        Some(other) => {
            return Err(ClaimError::Structure(format!(
                "{key} must be a date string, got {}",
                json_kind(other)
            )))
        }
    };

    if text.is_empty() || text.eq_ignore_ascii_case("unknown") || text.eq_ignore_ascii_case("n/a")
    {
        return Ok(None);
    }

    let date_part = match text.char_indices().nth(10) {
        Some((idx, 'T' | ' ')) => &text[..idx],
        _ => text,
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ClaimError::Structure(format!("{key} is not a YYYY-MM-DD date: {text}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
