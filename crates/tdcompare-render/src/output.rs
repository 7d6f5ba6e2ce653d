//! Output formats and rendered documents backed by scoped temp files.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tempfile::NamedTempFile;

use crate::error::RenderResult;

/// Downloadable report formats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Word document with a real table for the comparison rows.
    Docx,
    /// Fixed-layout pages with an embedded Unicode font.
    Pdf,
    /// The report text verbatim.
    Txt,
}

impl OutputFormat {
    /// Default delivery order.
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Docx, OutputFormat::Pdf, OutputFormat::Txt];

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Txt => "txt",
        }
    }

    /// Upper-case label for user-facing messages ("DOCX, PDF и TXT").
    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "DOCX",
            OutputFormat::Pdf => "PDF",
            OutputFormat::Txt => "TXT",
        }
    }
}

/// Locale-dependent strings placed in rendered documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLabels {
    /// Heading at the top of rich and fixed-layout documents.
    pub heading: String,
    /// File name without extension, e.g. `Сравнение_ИИ`.
    pub file_stem: String,
}

impl DocumentLabels {
    pub fn new(heading: impl Into<String>, file_stem: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            file_stem: file_stem.into(),
        }
    }

    pub fn file_name(&self, format: OutputFormat) -> String {
        format!("{}.{}", self.file_stem, format.extension())
    }
}

/// A rendered report waiting for delivery.
///
/// The bytes live in a temp file that is removed when this value is
/// dropped, so delivery failures cannot leak files.
#[derive(Debug)]
pub struct RenderedDocument {
    format: OutputFormat,
    file_name: String,
    file: NamedTempFile,
    len: usize,
}

impl RenderedDocument {
    /// Write `bytes` to a fresh temp file.
    pub fn write(format: OutputFormat, file_name: String, bytes: &[u8]) -> RenderResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("tdcompare-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self {
            format,
            file_name,
            file,
            len: bytes.len(),
        })
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Human-readable name to attach the document under.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Location of the temp file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
