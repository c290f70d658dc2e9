//! HTTP OCR client.
//!
//! Sends the PDF as a base64 data URL and joins the returned pages as
//! `[Page N]\n<markdown>\n\n`. Compatible with the Mistral `/v1/ocr` API.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::pipeline::claims::{ClaimError, OcrService};

pub struct HttpOcrService {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::blocking::Client,
}

impl HttpOcrService {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, ClaimError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClaimError::Ocr(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: OcrDocument,
}

#[derive(Serialize)]
struct OcrDocument {
    #[serde(rename = "type")]
    kind: &'static str,
    document_url: String,
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrPage>,
}

#[derive(Deserialize)]
struct OcrPage {
    index: u32,
    #[serde(default)]
    markdown: String,
}

fn build_request<'a>(model: &'a str, file_bytes: &[u8]) -> OcrRequest<'a> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(file_bytes);
    OcrRequest {
        model,
        document: OcrDocument {
            kind: "document_url",
            document_url: format!("data:application/pdf;base64,{encoded}"),
        },
    }
}

/// Join non-empty pages in the order returned.
fn assemble_pages(pages: &[OcrPage]) -> String {
    pages
        .iter()
        .filter(|p| !p.markdown.is_empty())
        .map(|p| format!("[Page {}]\n{}\n\n", p.index, p.markdown))
        .collect()
}

impl OcrService for HttpOcrService {
    fn extract_text(&self, file_bytes: &[u8], filename: &str) -> Result<String, ClaimError> {
        tracing::info!(filename, size = file_bytes.len(), "Sending document to OCR");

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&build_request(&self.model, file_bytes));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| ClaimError::Ocr(format!("{filename}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClaimError::Ocr(format!(
                "{filename}: status {}: {body}",
                status.as_u16()
            )));
        }

        let parsed: OcrResponse = response
            .json()
            .map_err(|e| ClaimError::Ocr(format!("{filename}: unreadable response: {e}")))?;

        let text = assemble_pages(&parsed.pages);
        tracing::info!(filename, pages = parsed.pages.len(), len = text.len(), "OCR finished");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_tagged_and_joined() {
        let parsed: OcrResponse = serde_json::from_str(
            r##"{"pages": [
                {"index": 0, "markdown": "# City Hospital"},
                {"index": 1, "markdown": ""},
                {"index": 2, "markdown": "Total: 1,200.00"}
            ]}"##,
        )
        .unwrap();
        assert_eq!(
            assemble_pages(&parsed.pages),
            "[Page 0]\n# City Hospital\n\n[Page 2]\nTotal: 1,200.00\n\n"
        );
    }

    #[test]
    fn no_pages_yields_empty_text() {
        let parsed: OcrResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(assemble_pages(&parsed.pages), "");
    }

    #[test]
    fn request_carries_pdf_data_url() {
        let json = serde_json::to_value(build_request("ocr-model", b"%PDF")).unwrap();
        assert_eq!(json["model"], "ocr-model");
        assert_eq!(json["document"]["type"], "document_url");
        assert_eq!(
            json["document"]["document_url"],
            "data:application/pdf;base64,JVBERg=="
        );
    }

    #[test]
    fn blank_api_key_is_dropped() {
        let service =
            HttpOcrService::new("https://ocr.example/v1/ocr/", Some("  ".into()), "m", 5).unwrap();
        assert!(service.api_key.is_none());
        assert_eq!(service.endpoint, "https://ocr.example/v1/ocr");
    }
}
