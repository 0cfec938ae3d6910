//! PDF text extraction
//!
//! Reads a PDF from disk and returns whitespace-normalized page text.

use super::{Tool, READ_DOCUMENT_TOOL};
use crate::error::AnalyzerError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

const PDF_SIGNATURE: &[u8] = b"%PDF-";
/// Readers accept the header anywhere in the first kilobyte
const SIGNATURE_WINDOW: usize = 1024;

/// Text and fingerprint of an extracted document
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub page_count: usize,
    pub pages_with_text: usize,
    pub digest: String,
}

/// Whether the PDF header appears within the leading window
pub fn is_pdf_signature(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
    window
        .windows(PDF_SIGNATURE.len())
        .any(|w| w == PDF_SIGNATURE)
}

/// Hex-encoded SHA-256 of the raw document bytes
pub fn document_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Trim every line, drop blank lines and pages, join pages with a blank line.
pub fn normalize_pages<'a, I>(pages: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    pages
        .into_iter()
        .map(|page| {
            page.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Extract a PDF from disk.
///
/// Fails with `DocumentNotFound` for a missing path, `InvalidPdf` when the
/// parser rejects the bytes and `NoExtractableText` when no page carries text.
pub async fn extract_document(path: impl AsRef<Path>) -> Result<ExtractedDocument> {
    let path = path.as_ref();
    let shown = path.display().to_string();

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AnalyzerError::DocumentNotFound(shown));
        }
        Err(e) => return Err(e.into()),
    };

    let digest = document_digest(&bytes);

    // The parser is CPU-bound and may panic on malformed input.
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| AnalyzerError::InvalidPdf(format!("{}: parser aborted: {}", shown, e)))?
    .map_err(|e| AnalyzerError::InvalidPdf(format!("{}: {}", shown, e)))?;

    let pages_with_text = pages.iter().filter(|p| !p.trim().is_empty()).count();
    let text = normalize_pages(pages.iter().map(String::as_str));

    debug!(
        path = %shown,
        page_count = pages.len(),
        pages_with_text,
        characters = text.len(),
        "PDF extracted"
    );

    if text.is_empty() {
        return Err(AnalyzerError::NoExtractableText(shown));
    }

    Ok(ExtractedDocument {
        text,
        page_count: pages.len(),
        pages_with_text,
        digest,
    })
}

/// Read PDF text and return it as a single string.
pub async fn read_pdf_text(path: impl AsRef<Path>) -> Result<String> {
    Ok(extract_document(path).await?.text)
}

/// Reads the uploaded PDF at `path`
pub struct FinancialDocumentTool;

#[async_trait::async_trait]
impl Tool for FinancialDocumentTool {
    fn name(&self) -> &'static str {
        READ_DOCUMENT_TOOL
    }

    fn description(&self) -> &'static str {
        "Read the uploaded PDF and return its normalized text"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let path = input
            .parameters
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AnalyzerError::InvalidToolInput("Expected 'path' in tool_input".to_string())
            })?;

        let document = extract_document(path).await?;

        Ok(ToolOutput {
            success: true,
            data: json!({
                "text": document.text,
                "page_count": document.page_count,
                "pages_with_text": document.pages_with_text,
                "digest": document.digest,
            }),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{make_blank_pdf, make_test_pdf};
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_normalize_pages() {
        let pages = ["  Balance Sheet  \n\n   Total assets 100 \n", "   \n  ", "Page two\n"];
        assert_eq!(
            normalize_pages(pages.iter().copied()),
            "Balance Sheet\nTotal assets 100\n\nPage two"
        );
    }

    #[test]
    fn test_pdf_signature() {
        assert!(is_pdf_signature(b"%PDF-1.4\n..."));
        assert!(!is_pdf_signature(b"PK\x03\x04"));
        assert!(!is_pdf_signature(b""));
    }

    #[test]
    fn test_pdf_signature_after_leading_bytes() {
        let mut prefixed = vec![b' '; 512];
        prefixed.extend_from_slice(b"%PDF-1.7\n");
        assert!(is_pdf_signature(&prefixed));

        let mut too_late = vec![0u8; SIGNATURE_WINDOW];
        too_late.extend_from_slice(b"%PDF-1.7\n");
        assert!(!is_pdf_signature(&too_late));
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(document_digest(b"abc"), document_digest(b"abc"));
        assert_eq!(
            document_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_extracts_text_from_pdf() {
        let file = write_temp(&make_test_pdf(&["Total Revenue 500000", "Net Income 50000"]));

        let text = read_pdf_text(file.path()).await.unwrap();
        assert!(!text.is_empty());
        assert!(text.contains("Revenue"), "unexpected text: {text}");
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");
        let result = read_pdf_text(&missing).await;
        match result {
            Err(AnalyzerError::DocumentNotFound(shown)) => {
                assert_eq!(shown, missing.display().to_string());
            }
            other => panic!("expected DocumentNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_invalid_pdf() {
        let file = write_temp(b"this is definitely not a pdf");
        let result = read_pdf_text(file.path()).await;
        match result {
            Err(AnalyzerError::InvalidPdf(detail)) => {
                assert!(detail.starts_with(&file.path().display().to_string()));
            }
            other => panic!("expected InvalidPdf, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pdf_without_text_is_a_defined_failure() {
        let file = write_temp(&make_blank_pdf());
        let result = read_pdf_text(file.path()).await;
        assert!(matches!(result, Err(AnalyzerError::NoExtractableText(_))));
    }

    #[tokio::test]
    async fn test_tool_requires_path() {
        let input = ToolInput {
            tool_name: READ_DOCUMENT_TOOL.to_string(),
            parameters: json!({}),
        };
        let result = FinancialDocumentTool.execute(&input).await;
        assert!(matches!(result, Err(AnalyzerError::InvalidToolInput(_))));
    }

    #[tokio::test]
    async fn test_tool_returns_text_and_digest() {
        let bytes = make_test_pdf(&["Total Assets 900000"]);
        let file = write_temp(&bytes);

        let input = ToolInput {
            tool_name: READ_DOCUMENT_TOOL.to_string(),
            parameters: json!({ "path": file.path().to_string_lossy() }),
        };
        let output = FinancialDocumentTool.execute(&input).await.unwrap();

        assert!(output.success);
        assert_eq!(output.data["page_count"], 1);
        assert_eq!(output.data["digest"], document_digest(&bytes));
        assert!(output.data["text"].as_str().unwrap().contains("Assets"));
    }
}
