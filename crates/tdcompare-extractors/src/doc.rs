//! Legacy `.doc` extraction through the `antiword` command-line tool.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::types::{DocumentFormat, ExtractedText};
use crate::Extractor;

const DEFAULT_PROGRAM: &str = "antiword";

/// Binary Word document extractor.
///
/// antiword only reads named files, so the upload is written to a
/// temporary `.doc` file that is removed once the converter exits. The
/// converter is invoked as `<program> -m UTF-8.txt <path>` and its stdout
/// is taken as the text.
#[derive(Debug, Clone)]
pub struct DocExtractor {
    program: String,
}

impl Default for DocExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocExtractor {
    pub fn new() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
        }
    }

    /// Use a different converter binary (must accept `-m UTF-8.txt <path>`).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Extractor for DocExtractor {
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedText> {
        let file = tempfile::Builder::new()
            .prefix("tdcompare-")
            .suffix(".doc")
            .tempfile()?;
        tokio::fs::write(file.path(), content).await?;

        let output = Command::new(&self.program)
            .args(["-m", "UTF-8.txt"])
            .arg(file.path())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractError::Doc(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Doc(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8(output.stdout)?;
        debug!(chars = text.len(), "Extracted DOC text");

        Ok(ExtractedText::new(text, DocumentFormat::Doc, content.len()))
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Doc
    }

    fn name(&self) -> &str {
        "antiword"
    }
}
