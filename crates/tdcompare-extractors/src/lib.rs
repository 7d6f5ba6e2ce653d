//! tdcompare-extractors - Text extraction for uploaded documents.
//!
//! Turns the raw bytes of an uploaded file into plain text, given its
//! declared [`DocumentFormat`].
//!
//! # Features
//!
//! - `pdf` (default) - PDF text extraction via pdf-extract
//! - `docx` (default) - DOCX text extraction via docx-rs
//! - `doc` (default) - legacy DOC extraction via the `antiword` tool
//!
//! Plain text is always available.
//!
//! # Example
//!
//! ```ignore
//! use tdcompare_extractors::{DocumentFormat, ExtractionPipeline};
//!
//! let pipeline = ExtractionPipeline::with_defaults();
//! let format = DocumentFormat::from_file_name("datasheet.pdf")?;
//! let extracted = pipeline.extract(&pdf_bytes, format).await?;
//! ```

mod error;
mod factory;
mod pipeline;
mod txt;
mod types;

#[cfg(feature = "pdf")]
mod pdf;

#[cfg(feature = "docx")]
mod docx;

#[cfg(feature = "doc")]
mod doc;

pub use error::{ExtractError, ExtractResult};
pub use factory::ExtractorFactory;
pub use pipeline::ExtractionPipeline;
pub use txt::TxtExtractor;
pub use types::{DocumentFormat, ExtractedText};

#[cfg(feature = "pdf")]
pub use pdf::PdfExtractor;

#[cfg(feature = "docx")]
pub use docx::DocxExtractor;

#[cfg(feature = "doc")]
pub use doc::DocExtractor;

use async_trait::async_trait;

/// Core Extractor trait - every document format extractor implements this.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract plain text from the file bytes.
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedText>;

    /// Format handled by this extractor.
    fn format(&self) -> DocumentFormat;

    /// Check if this extractor handles the given format.
    fn supports(&self, format: DocumentFormat) -> bool {
        self.format() == format
    }

    /// Human-readable name for this extractor.
    fn name(&self) -> &str;
}
