//! Extraction error types.

use thiserror::Error;

/// Errors that can occur during text extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// File extension is not one of the supported document formats.
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// No extractor is registered for a supported format (feature disabled).
    #[error("No extractor available for format: {0}")]
    NoExtractor(String),

    /// Extraction process failed.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Plain text was not valid UTF-8.
    #[error("Text is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// IO error during extraction.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF-specific extraction error.
    #[cfg(feature = "pdf")]
    #[error("PDF extraction error: {0}")]
    Pdf(String),

    /// DOCX-specific extraction error.
    #[cfg(feature = "docx")]
    #[error("DOCX extraction error: {0}")]
    Docx(String),

    /// DOC conversion tool failed or is not installed.
    #[cfg(feature = "doc")]
    #[error("DOC extraction error: {0}")]
    Doc(String),

    /// Task join error from spawn_blocking.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;
