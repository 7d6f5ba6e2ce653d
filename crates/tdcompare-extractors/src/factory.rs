//! Factory for creating extractors.

use std::sync::Arc;

use crate::{Extractor, TxtExtractor};

#[cfg(feature = "pdf")]
use crate::PdfExtractor;

#[cfg(feature = "docx")]
use crate::DocxExtractor;

#[cfg(feature = "doc")]
use crate::DocExtractor;

/// Factory for creating text extractors.
pub struct ExtractorFactory;

impl ExtractorFactory {
    /// Create a plain text extractor.
    pub fn txt() -> Arc<dyn Extractor> {
        Arc::new(TxtExtractor::new())
    }

    /// Create a PDF extractor.
    #[cfg(feature = "pdf")]
    pub fn pdf() -> Arc<dyn Extractor> {
        Arc::new(PdfExtractor::new())
    }

    /// Create a DOCX extractor.
    #[cfg(feature = "docx")]
    pub fn docx() -> Arc<dyn Extractor> {
        Arc::new(DocxExtractor::new())
    }

    /// Create a legacy DOC extractor backed by `antiword`.
    #[cfg(feature = "doc")]
    pub fn doc() -> Arc<dyn Extractor> {
        Arc::new(DocExtractor::new())
    }

    /// Get all available extractors.
    #[allow(clippy::vec_init_then_push)]
    pub fn all() -> Vec<Arc<dyn Extractor>> {
        let mut extractors: Vec<Arc<dyn Extractor>> = Vec::new();

        #[cfg(feature = "pdf")]
        extractors.push(Self::pdf());

        #[cfg(feature = "docx")]
        extractors.push(Self::docx());

        #[cfg(feature = "doc")]
        extractors.push(Self::doc());

        extractors.push(Self::txt());

        extractors
    }
}
