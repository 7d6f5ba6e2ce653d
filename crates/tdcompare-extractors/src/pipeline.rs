//! Extraction pipeline routing uploads to the extractor for their format.

use std::sync::Arc;

use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::types::{DocumentFormat, ExtractedText};
use crate::Extractor;

/// Pipeline for extracting text using registered extractors.
pub struct ExtractionPipeline {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractionPipeline {
    /// Create new empty pipeline.
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Create pipeline with all available extractors.
    pub fn with_defaults() -> Self {
        Self {
            extractors: crate::ExtractorFactory::all(),
        }
    }

    /// Add an extractor to the pipeline.
    pub fn add_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Extract text using the extractor registered for `format`.
    pub async fn extract(
        &self,
        content: &[u8],
        format: DocumentFormat,
    ) -> ExtractResult<ExtractedText> {
        let extractor = self
            .extractors
            .iter()
            .find(|e| e.supports(format))
            .ok_or_else(|| ExtractError::NoExtractor(format.to_string()))?;

        debug!(
            extractor = extractor.name(),
            %format,
            bytes = content.len(),
            "Extracting document text"
        );
        extractor.extract(content).await
    }

    /// Check if pipeline can handle a given format.
    pub fn supports(&self, format: DocumentFormat) -> bool {
        self.extractors.iter().any(|e| e.supports(format))
    }

    /// Get the number of registered extractors.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Check if the pipeline has no registered extractors.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}
