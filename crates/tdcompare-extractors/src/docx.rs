//! DOCX text extraction using docx-rs.
//!
//! Paragraph text is kept in document order; tables are flattened to one
//! line per row with cells joined by ` | ` so parameter tables in technical
//! documents survive as comparable lines.

use async_trait::async_trait;
use docx_rs::{DocumentChild, ParagraphChild, RunChild, TableChild, TableRowChild};

use crate::error::{ExtractError, ExtractResult};
use crate::types::{DocumentFormat, ExtractedText};
use crate::Extractor;

/// DOCX text extractor using the docx-rs library.
#[derive(Debug, Clone, Default)]
pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract text synchronously (called within spawn_blocking).
    fn extract_sync(content: Vec<u8>) -> ExtractResult<String> {
        let docx = docx_rs::read_docx(&content)
            .map_err(|e| ExtractError::Docx(format!("Failed to parse DOCX: {}", e)))?;

        let mut text_parts: Vec<String> = Vec::new();

        for child in docx.document.children {
            match child {
                DocumentChild::Paragraph(p) => {
                    let para_text = Self::paragraph_text(&p);
                    if !para_text.trim().is_empty() {
                        text_parts.push(para_text);
                    }
                }
                DocumentChild::Table(t) => {
                    text_parts.extend(
                        Self::table_rows(&t)
                            .iter()
                            .map(|row| row.join(" | "))
                            .filter(|line| !line.trim().is_empty()),
                    );
                }
                _ => {}
            }
        }

        Ok(text_parts.join("\n"))
    }

    fn paragraph_text(p: &docx_rs::Paragraph) -> String {
        let mut text = String::new();

        for child in &p.children {
            match child {
                ParagraphChild::Run(r) => Self::push_run(&mut text, r),
                // Hyperlink children are ParagraphChild too
                ParagraphChild::Hyperlink(h) => {
                    for child in &h.children {
                        if let ParagraphChild::Run(r) = child {
                            Self::push_run(&mut text, r);
                        }
                    }
                }
                _ => {}
            }
        }

        text
    }

    fn push_run(text: &mut String, run: &docx_rs::Run) {
        for run_child in &run.children {
            match run_child {
                RunChild::Text(t) => text.push_str(&t.text),
                RunChild::Tab(_) => text.push('\t'),
                RunChild::Break(_) => text.push('\n'),
                _ => {}
            }
        }
    }

    fn table_rows(t: &docx_rs::Table) -> Vec<Vec<String>> {
        let mut rows = Vec::new();

        for row in &t.rows {
            let TableChild::TableRow(r) = row;
            let mut cells = Vec::new();
            for cell in &r.cells {
                let TableRowChild::TableCell(c) = cell;
                let mut cell_text = String::new();
                for child in &c.children {
                    if let docx_rs::TableCellContent::Paragraph(p) = child {
                        let para = Self::paragraph_text(p);
                        if !cell_text.is_empty() && !para.is_empty() {
                            cell_text.push(' ');
                        }
                        cell_text.push_str(&para);
                    }
                }
                cells.push(cell_text.trim().to_string());
            }
            rows.push(cells);
        }

        rows
    }
}

#[async_trait]
impl Extractor for DocxExtractor {
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedText> {
        let content = content.to_vec();
        let content_len = content.len();
        let text = tokio::task::spawn_blocking(move || Self::extract_sync(content)).await??;

        Ok(ExtractedText::new(text, DocumentFormat::Docx, content_len))
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn name(&self) -> &str {
        "docx-rs"
    }
}
