//! Prompt builders for the two model calls.

use chrono::NaiveDate;

pub const EXTRACTION_SYSTEM: &str =
    "You are a medical claim document extractor. Output valid JSON only.";

pub const DECISION_SYSTEM: &str =
    "You are a medical insurance claim adjudicator. Output valid JSON only.";

/// Prompt asking for every bill and discharge summary in one OCR text.
pub fn extraction_prompt(ocr_text: &str) -> String {
    format!(
        "Read the OCR text of a scanned medical claim document and extract every \
hospital bill and discharge summary it contains.\n\n\
RULES:\n\
1. Output a JSON array, one object per document.\n\
2. Each object has \"type\": \"bill\" or \"discharge_summary\".\n\
3. Dates use YYYY-MM-DD.\n\
4. If a field is not found use: \"Unknown Hospital\", \"Unknown Patient\", \
\"Unknown Diagnosis\", 0.0 for amounts, \"2024-01-01\" for dates.\n\
5. Never invent values that are not in the text.\n\n\
OUTPUT FORMAT:\n\
```json\n\
[\n\
  {{\"type\": \"bill\", \"hospital_name\": \"...\", \"total_amount\": 0.0, \
\"date_of_service\": \"YYYY-MM-DD\", \"patient_name\": \"...\"}},\n\
  {{\"type\": \"discharge_summary\", \"patient_name\": \"...\", \"diagnosis\": \"...\", \
\"admission_date\": \"YYYY-MM-DD\", \"discharge_date\": \"YYYY-MM-DD\", \
\"hospital_name\": \"...\"}}\n\
]\n\
```\n\n\
OCR TEXT:\n\
{ocr_text}"
    )
}

/// Prompt asking for validation findings and a decision over the whole claim.
pub fn decision_prompt(documents_json: &str, today: NaiveDate) -> String {
    format!(
        "Review the extracted documents of one medical insurance claim. TODAY is {today}.\n\n\
Check that a bill and a discharge summary are both present, that patient and \
hospital names agree across documents, that the service date falls within the \
stay, and that amounts are plausible. Values such as \"Unknown Hospital\" or \
\"2024-01-01\" mean the field was not found.\n\n\
OUTPUT FORMAT:\n\
```json\n\
{{\n\
  \"validation_result\": {{\n\
    \"missing_documents\": [\"bill\" | \"discharge_summary\"],\n\
    \"discrepancies\": [\"...\"],\n\
    \"data_quality_score\": 0-100,\n\
    \"recommendations\": [\"...\"]\n\
  }},\n\
  \"claim_decision\": {{\n\
    \"status\": \"approved\" | \"conditional_approval\" | \"rejected\",\n\
    \"reason\": \"...\",\n\
    \"confidence_score\": 0-100,\n\
    \"required_actions\": [\"...\"]\n\
  }}\n\
}}\n\
```\n\n\
DOCUMENTS:\n\
{documents_json}"
    )
}
