//! Error taxonomy for the claim pipeline.
//!
//! Only `InvalidRequest` and `Processing` ever leave `ClaimProcessor`.
//! The other variants are produced by collaborators and the normalizer,
//! then recovered inside the stage that owns them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Record does not match document schema: {0}")]
    Structure(String),

    #[error("Failed to process claim documents: {0}")]
    Processing(String),
}

impl ClaimError {
    /// True for errors caused by the caller's input rather than by the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}
