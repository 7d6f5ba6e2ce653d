//! Report renderer dispatching to the per-format writers.

use std::path::Path;

use tracing::debug;

use crate::docx::render_docx;
use crate::error::{RenderError, RenderResult};
use crate::output::{DocumentLabels, OutputFormat, RenderedDocument};
use crate::pdf::PdfRenderer;

/// Renders report text into every configured output format.
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    formats: Vec<OutputFormat>,
    pdf: Option<PdfRenderer>,
}

impl ReportRenderer {
    /// Create a renderer for `formats`.
    ///
    /// When pdf is requested the font is loaded here, so a missing font
    /// fails construction (and startup) instead of the first comparison.
    pub fn new(formats: Vec<OutputFormat>, font_path: impl AsRef<Path>) -> RenderResult<Self> {
        let pdf = if formats.contains(&OutputFormat::Pdf) {
            Some(PdfRenderer::from_font_path(font_path)?)
        } else {
            None
        };

        Ok(Self { formats, pdf })
    }

    /// Renderer without fixed-layout output; needs no font.
    pub fn without_pdf(formats: Vec<OutputFormat>) -> Self {
        Self {
            formats: formats
                .into_iter()
                .filter(|f| *f != OutputFormat::Pdf)
                .collect(),
            pdf: None,
        }
    }

    /// Configured formats in delivery order.
    pub fn formats(&self) -> &[OutputFormat] {
        &self.formats
    }

    /// Encode `report_text` as `format` without touching the filesystem.
    pub fn render_bytes(
        &self,
        report_text: &str,
        format: OutputFormat,
        labels: &DocumentLabels,
    ) -> RenderResult<Vec<u8>> {
        match format {
            OutputFormat::Txt => Ok(report_text.as_bytes().to_vec()),
            OutputFormat::Docx => render_docx(report_text, &labels.heading),
            OutputFormat::Pdf => self
                .pdf
                .as_ref()
                .ok_or_else(|| RenderError::FormatDisabled(format.to_string()))?
                .render(report_text, &labels.heading),
        }
    }

    /// Render one format into a scoped temp file.
    pub async fn render(
        &self,
        report_text: &str,
        format: OutputFormat,
        labels: &DocumentLabels,
    ) -> RenderResult<RenderedDocument> {
        let this = self.clone();
        let text = report_text.to_string();
        let labels = labels.clone();

        let document = tokio::task::spawn_blocking(move || {
            let bytes = this.render_bytes(&text, format, &labels)?;
            RenderedDocument::write(format, labels.file_name(format), &bytes)
        })
        .await??;

        debug!(
            %format,
            bytes = document.len(),
            path = %document.path().display(),
            "Rendered report"
        );
        Ok(document)
    }
}
