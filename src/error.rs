//! Error types for the financial document analyzer

use thiserror::Error;

/// Result type alias for analyzer operations
pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Error, Debug)]
pub enum AnalyzerError {

    // =============================
    // Input Errors
    // =============================

    #[error("Invalid upload: {0}")]
    InvalidInput(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    // =============================
    // Extraction Errors
    // =============================

    #[error("PDF file not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid PDF document: {0}")]
    InvalidPdf(String),

    #[error("No extractable text in document: {0}")]
    NoExtractableText(String),

    // =============================
    // Pipeline Errors
    // =============================

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Pipeline error: {0}")]
    PipelineError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AnalyzerError {
    /// Whether the error was caused by the document itself rather than the service
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self,
            AnalyzerError::InvalidPdf(_) | AnalyzerError::NoExtractableText(_)
        )
    }
}
