//! Rich-document output built with docx-rs.

use std::io::Cursor;

use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};

use crate::error::{RenderError, RenderResult};
use crate::table::{ComparisonTable, ReportLayout};

const HEADING_SIZE: usize = 32; // half-points
const BODY_SIZE: usize = 22;

/// Build a DOCX document: heading, comparison table (if any), then prose.
pub fn render_docx(report_text: &str, heading: &str) -> RenderResult<Vec<u8>> {
    let layout = ReportLayout::parse(report_text);

    let mut docx = Docx::new().add_paragraph(
        Paragraph::new().add_run(Run::new().add_text(heading).bold().size(HEADING_SIZE)),
    );

    if let Some(ref table) = layout.table {
        docx = docx.add_table(build_table(table));
    }

    for line in &layout.paragraphs {
        docx = docx.add_paragraph(text_paragraph(line, false));
    }

    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| RenderError::encode("docx", e))?;

    Ok(buf.into_inner())
}

fn build_table(table: &ComparisonTable) -> Table {
    let header = TableRow::new(
        table
            .headers
            .iter()
            .map(|h| TableCell::new().add_paragraph(text_paragraph(h, true)))
            .collect(),
    );

    let mut rows = Vec::with_capacity(table.rows.len() + 1);
    rows.push(header);
    rows.extend(table.rows.iter().map(|row| {
        TableRow::new(
            row.iter()
                .map(|cell| TableCell::new().add_paragraph(text_paragraph(cell, false)))
                .collect(),
        )
    }));

    Table::new(rows)
}

fn text_paragraph(text: &str, bold: bool) -> Paragraph {
    let mut run = Run::new().add_text(text).size(BODY_SIZE);
    if bold {
        run = run.bold();
    }
    Paragraph::new().add_run(run)
}
