//! Claim processing pipeline.
//!
//! - `claims`: typed records, model-output cleanup and the staged decision flow
//! - `clients`: HTTP implementations of the OCR and text-generation seams

pub mod claims;
pub mod clients;
