//! Medical Claim Pipeline
//!
//! Turns OCR text from scanned claim PDFs into typed documents and one
//! approve/reject decision.
//!
//! ## Flow
//!
//! ```text
//! OCR text → Extraction (Sanitizer → Normalizer → Quality Gate)
//!          → Date Validator → Decision (model call)
//!          → Stage Aggregator → Decision Resolver → ClaimResponse
//! ```
//!
//! Model output is untrusted. Every parse and call failure degrades to less
//! data, and less data resolves to a rejection, never to an approval.

pub mod error;
pub mod types;
pub mod traits;
pub mod sanitize;
pub mod normalizer;
pub mod quality;
pub mod dates;
pub mod aggregator;
pub mod resolver;
pub mod context;
pub mod prompt;
pub mod stages;
pub mod files;
pub mod processor;

pub use error::ClaimError;
pub use types::*;
pub use traits::*;
pub use sanitize::sanitize_json_response;
pub use normalizer::{deduplicate, normalize_documents, normalize_response, synthesize_counterpart};
pub use quality::{apply_quality_gate, QualityIssue, QualityReport};
pub use dates::{future_date_unit, validate_document_dates, DateViolation};
pub use aggregator::aggregate_units;
pub use resolver::resolve_claim;
pub use context::ClaimContext;
pub use stages::{parse_decision_response, run_decision_stage, run_extraction_stage};
pub use files::{validate_uploads, UploadLimits, UploadedFile};
pub use processor::{ClaimProcessor, ProcessorSettings};
