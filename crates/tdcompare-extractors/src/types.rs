//! Core types for text extraction.

use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{Display, EnumIter, EnumString};

use crate::error::{ExtractError, ExtractResult};

/// Document formats accepted for upload.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DocumentFormat {
    /// PDF document.
    Pdf,
    /// Office Open XML word document.
    Docx,
    /// Legacy binary Word document.
    Doc,
    /// Plain UTF-8 text.
    Txt,
}

impl DocumentFormat {
    /// Resolve the format from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> ExtractResult<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ExtractError::UnsupportedFormat(file_name.to_string()))?;

        ext.parse()
            .map_err(|_| ExtractError::UnsupportedFormat(ext.to_lowercase()))
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Txt => "txt",
        }
    }
}

/// Extracted text with light metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Plain text; may be empty for image-only documents.
    pub text: String,

    /// Format the text was extracted from.
    pub format: DocumentFormat,

    /// Page count, when the format has pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,

    /// Size of the original upload in bytes.
    pub original_size: usize,
}

impl ExtractedText {
    /// Create new extracted text.
    pub fn new(text: String, format: DocumentFormat, original_size: usize) -> Self {
        Self {
            text,
            format,
            page_count: None,
            original_size,
        }
    }

    /// Attach a page count.
    pub fn with_page_count(mut self, page_count: usize) -> Self {
        self.page_count = Some(page_count);
        self
    }

    /// True when the text is empty after trimming whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
