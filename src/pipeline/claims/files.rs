//! Upload validation: count, filename, size and PDF header checks.
//!
//! Runs before any OCR call. Every failure is a client error.

use super::error::ClaimError;

const MAX_FILENAME_LEN: usize = 255;
const FORBIDDEN_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\', '/'];
const PDF_MAGIC: &[u8] = b"%PDF";

/// One uploaded file, as received.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_size_bytes: usize,
}

impl UploadLimits {
    pub fn new(max_files: usize, max_file_size_mb: usize) -> Self {
        Self {
            max_files,
            max_file_size_bytes: max_file_size_mb.saturating_mul(1024 * 1024),
        }
    }
}

/// Pair file contents with their names. Lengths must match.
pub fn pair_uploads(
    files: Vec<Vec<u8>>,
    filenames: Vec<String>,
) -> Result<Vec<UploadedFile>, ClaimError> {
    if files.len() != filenames.len() {
        return Err(ClaimError::InvalidRequest(format!(
            "Got {} files but {} filenames",
            files.len(),
            filenames.len()
        )));
    }
    Ok(files
        .into_iter()
        .zip(filenames)
        .map(|(content, filename)| UploadedFile { filename, content })
        .collect())
}

/// Validate the whole upload. Stops at the first failure.
pub fn validate_uploads(files: &[UploadedFile], limits: &UploadLimits) -> Result<(), ClaimError> {
    if files.is_empty() {
        return Err(ClaimError::InvalidRequest(
            "At least one file must be uploaded".into(),
        ));
    }
    if files.len() > limits.max_files {
        return Err(ClaimError::InvalidRequest(format!(
            "Too many files. Maximum {} files allowed per request",
            limits.max_files
        )));
    }

    for file in files {
        validate_filename(&file.filename)?;
        validate_size(file, limits)?;
        if !file.content.starts_with(PDF_MAGIC) {
            return Err(ClaimError::InvalidRequest(format!(
                "File {} is not a valid PDF file",
                file.filename
            )));
        }
        tracing::debug!(filename = %file.filename, size = file.content.len(), "Upload accepted");
    }
    Ok(())
}

fn validate_filename(filename: &str) -> Result<(), ClaimError> {
    if filename.is_empty() {
        return Err(ClaimError::InvalidRequest(
            "Uploaded file is missing a filename".into(),
        ));
    }
    if filename.chars().count() > MAX_FILENAME_LEN {
        return Err(ClaimError::InvalidRequest(format!(
            "Filename too long: {filename}"
        )));
    }
    if filename.contains(FORBIDDEN_FILENAME_CHARS) {
        return Err(ClaimError::InvalidRequest(format!(
            "Filename contains invalid characters: {filename}"
        )));
    }
    Ok(())
}

fn validate_size(file: &UploadedFile, limits: &UploadLimits) -> Result<(), ClaimError> {
    if file.content.is_empty() {
        return Err(ClaimError::InvalidRequest(format!(
            "File {} is empty",
            file.filename
        )));
    }
    if file.content.len() > limits.max_file_size_bytes {
        return Err(ClaimError::InvalidRequest(format!(
            "File {} is too large. Maximum {}MB allowed",
            file.filename,
            limits.max_file_size_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str) -> UploadedFile {
        UploadedFile {
            filename: name.into(),
            content: b"%PDF-1.7 body".to_vec(),
        }
    }

    fn limits() -> UploadLimits {
        UploadLimits::new(2, 1)
    }

    fn message(result: Result<(), ClaimError>) -> String {
        match result {
            Err(ClaimError::InvalidRequest(msg)) => msg,
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn huge_size_limit_saturates() {
        let limits = UploadLimits::new(1, usize::MAX / 2);
        assert_eq!(limits.max_file_size_bytes, usize::MAX);
        assert!(validate_uploads(&[pdf("bill.pdf")], &limits).is_ok());
    }

    #[test]
    fn accepts_valid_pdfs() {
        assert!(validate_uploads(&[pdf("bill.pdf"), pdf("summary.pdf")], &limits()).is_ok());
    }

    #[test]
    fn rejects_empty_upload() {
        assert!(message(validate_uploads(&[], &limits())).contains("At least one file"));
    }

    #[test]
    fn rejects_too_many_files() {
        let files = vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")];
        assert!(message(validate_uploads(&files, &limits())).contains("Maximum 2 files"));
    }

    #[test]
    fn rejects_bad_filenames() {
        for name in ["", "../etc/passwd", "a<b>.pdf", "what?.pdf", "c:\\x.pdf"] {
            assert!(validate_uploads(&[pdf(name)], &limits()).is_err(), "{name}");
        }
        let long = format!("{}.pdf", "a".repeat(252));
        assert!(message(validate_uploads(&[pdf(&long)], &limits())).contains("too long"));
    }

    #[test]
    fn rejects_empty_and_oversized_files() {
        let empty = UploadedFile {
            filename: "empty.pdf".into(),
            content: vec![],
        };
        assert!(message(validate_uploads(&[empty], &limits())).contains("is empty"));

        let mut big = b"%PDF".to_vec();
        big.resize(1024 * 1024 + 1, b'0');
        let big = UploadedFile {
            filename: "big.pdf".into(),
            content: big,
        };
        assert!(message(validate_uploads(&[big], &limits())).contains("too large"));
    }

    #[test]
    fn rejects_non_pdf_content() {
        let png = UploadedFile {
            filename: "scan.pdf".into(),
            content: b"\x89PNG\r\n".to_vec(),
        };
        assert!(message(validate_uploads(&[png], &limits())).contains("not a valid PDF"));
    }

    #[test]
    fn pairing_requires_equal_lengths() {
        let err = pair_uploads(vec![b"%PDF".to_vec()], vec![]).unwrap_err();
        assert!(err.is_client_error());

        let paired = pair_uploads(vec![b"%PDF".to_vec()], vec!["a.pdf".into()]).unwrap();
        assert_eq!(paired[0].filename, "a.pdf");
    }
}
