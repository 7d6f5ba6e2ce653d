//! Plain text extraction.

use async_trait::async_trait;

use crate::error::ExtractResult;
use crate::types::{DocumentFormat, ExtractedText};
use crate::Extractor;

/// Extractor for `.txt` uploads.
///
/// Content must be valid UTF-8; a leading byte-order mark is dropped.
#[derive(Debug, Clone, Default)]
pub struct TxtExtractor;

impl TxtExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for TxtExtractor {
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedText> {
        let text = String::from_utf8(content.to_vec())?;
        let text = text
            .strip_prefix('\u{feff}')
            .map(str::to_string)
            .unwrap_or(text);

        Ok(ExtractedText::new(text, DocumentFormat::Txt, content.len()))
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Txt
    }

    fn name(&self) -> &str {
        "utf8-text"
    }
}
