//! Trait seams for the claim pipeline's external collaborators.
//!
//! - OcrService: PDF bytes → page-ordered markdown text
//! - TextGenerator: prompt → raw model text
//!
//! Both are synchronous. The HTTP layer drives the pipeline on a blocking
//! worker, so implementations may block.

use super::error::ClaimError;

/// Converts one PDF into plain text.
pub trait OcrService: Send + Sync {
    /// Return the document text, pages joined in order.
    /// Callers treat an error as "no text" and move on.
    fn extract_text(&self, file_bytes: &[u8], filename: &str) -> Result<String, ClaimError>;
}

/// Produces raw text from a prompt. Output is untrusted and may be malformed.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, ClaimError>;
}

#[cfg(test)]
pub(crate) mod mocks {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Replays scripted responses in call order. `Err` entries become generation failures.
    pub struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, String>>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGenerator {
        pub fn new(responses: Vec<Result<&str, &str>>) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// (model, prompt) for every call made so far.
        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate(&self, model: &str, prompt: &str, _system: &str) -> Result<String, ClaimError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(msg)) => Err(ClaimError::Generation(msg)),
                None => Err(ClaimError::Generation("no scripted response left".into())),
            }
        }
    }

    /// Lets a test keep a handle on the generator after boxing it.
    impl TextGenerator for Arc<ScriptedGenerator> {
        fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, ClaimError> {
            self.as_ref().generate(model, prompt, system)
        }
    }

    /// Returns canned text per filename. Unknown filenames fail.
    pub struct MapOcr {
        pages: HashMap<String, String>,
    }

    impl MapOcr {
        pub fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                pages: entries
                    .iter()
                    .map(|(name, text)| (name.to_string(), text.to_string()))
                    .collect(),
            }
        }
    }

    impl OcrService for MapOcr {
        fn extract_text(&self, _file_bytes: &[u8], filename: &str) -> Result<String, ClaimError> {
            self.pages
                .get(filename)
                .cloned()
                .ok_or_else(|| ClaimError::Ocr(format!("no text for {filename}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traits_are_object_safe() {
        fn _assert_ocr(_: &dyn OcrService) {}
        fn _assert_generator(_: &dyn TextGenerator) {}
    }

    #[test]
    fn scripted_generator_replays_in_order() {
        let generator = mocks::ScriptedGenerator::new(vec![Ok("first"), Err("down")]);
        assert_eq!(generator.generate("m", "p", "s").unwrap(), "first");
        assert!(matches!(
            generator.generate("m", "p", "s"),
            Err(ClaimError::Generation(_))
        ));
        assert!(generator.generate("m", "p", "s").is_err());
        assert_eq!(generator.calls().len(), 3);
    }
}
