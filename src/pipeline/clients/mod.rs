//! HTTP implementations of the claim pipeline's collaborator traits.

pub mod generate;
pub mod ocr;

pub use generate::OllamaGenerator;
pub use ocr::HttpOcrService;
