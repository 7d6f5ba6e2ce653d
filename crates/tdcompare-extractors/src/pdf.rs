//! PDF text extraction using pdf-extract.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::types::{DocumentFormat, ExtractedText};
use crate::Extractor;

/// PDF text extractor using the pdf-extract library.
///
/// pdf-extract is synchronous and can panic on malformed input, so the
/// call runs inside spawn_blocking and panics surface as join errors
/// instead of taking the process down.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create new PDF extractor.
    pub fn new() -> Self {
        Self
    }

    fn extract_sync(content: Vec<u8>) -> ExtractResult<(String, usize)> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(&content)
            .map_err(|e| ExtractError::Pdf(format!("Failed to parse PDF: {}", e)))?;

        let page_count = pages.len();
        let text = pages
            .iter()
            .map(|page| page.trim_end())
            .collect::<Vec<_>>()
            .join("\n");

        Ok((text, page_count))
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedText> {
        let content = content.to_vec();
        let content_len = content.len();

        let (text, page_count) =
            tokio::task::spawn_blocking(move || Self::extract_sync(content)).await??;

        debug!(pages = page_count, chars = text.len(), "Extracted PDF text");

        Ok(ExtractedText::new(text, DocumentFormat::Pdf, content_len).with_page_count(page_count))
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn name(&self) -> &str {
        "pdf-extract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printpdf::{BuiltinFont, Mm, PdfDocument};

    fn helvetica_pdf(lines: &[&str]) -> Vec<u8> {
        let (doc, page, layer) = PdfDocument::new("Datasheet", Mm(210.0), Mm(297.0), "Layer 1");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica).unwrap();
        let layer = doc.get_page(page).get_layer(layer);
        for (i, line) in lines.iter().enumerate() {
            layer.use_text(*line, 12.0, Mm(20.0), Mm(270.0 - 10.0 * i as f32), &font);
        }
        doc.save_to_bytes().unwrap()
    }

    #[test]
    fn test_pdf_extractor_creation() {
        let extractor = PdfExtractor::new();
        assert_eq!(extractor.name(), "pdf-extract");
        assert!(extractor.supports(DocumentFormat::Pdf));
        assert!(!extractor.supports(DocumentFormat::Docx));
    }

    #[tokio::test]
    async fn test_pdf_corrupted_content_fails_without_crash() {
        let extractor = PdfExtractor::new();
        let result = extractor.extract(b"%PDF-1.4\nthis is not a real pdf").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_pdf_empty_content_fails() {
        let extractor = PdfExtractor::new();
        assert!(extractor.extract(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_pdf_extracts_text_and_pages() {
        let content = helvetica_pdf(&["Voltage: 5V", "Current: 2A"]);

        let extracted = PdfExtractor::new().extract(&content).await.unwrap();
        assert!(extracted.text.contains("Voltage: 5V"), "{:?}", extracted.text);
        assert!(extracted.text.contains("Current: 2A"), "{:?}", extracted.text);
        assert_eq!(extracted.page_count, Some(1));
        assert_eq!(extracted.format, DocumentFormat::Pdf);
    }
}
