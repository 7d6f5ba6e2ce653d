//! Fixed-layout output via printpdf.
//!
//! Builtin PDF fonts only cover Latin-1, so a TrueType font is embedded
//! to render Cyrillic reports. Lines are wrapped by their measured width
//! in that font, using the glyph advances from its `hmtx` table.

use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use printpdf::{Mm, PdfDocument};
use ttf_parser::Face;

use crate::error::{RenderError, RenderResult};

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN: f32 = 15.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH.0 - 2.0 * MARGIN;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 11.0;
const LINE_HEIGHT: f32 = 5.5;
const MM_PER_PT: f32 = 25.4 / 72.0;

/// PDF writer holding the embedded font bytes.
#[derive(Clone)]
pub struct PdfRenderer {
    font_path: PathBuf,
    font: Arc<Vec<u8>>,
}

impl std::fmt::Debug for PdfRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfRenderer")
            .field("font_path", &self.font_path)
            .field("font_bytes", &self.font.len())
            .finish()
    }
}

impl PdfRenderer {
    /// Load the font and check that both the metrics parser and printpdf
    /// accept it.
    pub fn from_font_path(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref().to_path_buf();
        let font = std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RenderError::MissingFont(path.clone()),
            _ => RenderError::FontLoad {
                path: path.clone(),
                message: e.to_string(),
            },
        })?;

        let renderer = Self {
            font_path: path,
            font: Arc::new(font),
        };
        renderer.render("", "tdcompare")?;
        Ok(renderer)
    }

    fn metrics(&self) -> RenderResult<FontMetrics<'_>> {
        let face = Face::parse(self.font.as_slice(), 0).map_err(|e| RenderError::FontLoad {
            path: self.font_path.clone(),
            message: e.to_string(),
        })?;
        Ok(FontMetrics::new(face))
    }

    /// Render the heading and every report line, wrapping long lines and
    /// starting new pages as needed.
    pub fn render(&self, report_text: &str, heading: &str) -> RenderResult<Vec<u8>> {
        let metrics = self.metrics()?;
        let pages = layout(report_text, heading, |text, size| {
            metrics.width_mm(text, size)
        });

        let (doc, first_page, first_layer) =
            PdfDocument::new(heading, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
        let font = doc
            .add_external_font(Cursor::new(self.font.as_slice()))
            .map_err(|e| RenderError::FontLoad {
                path: self.font_path.clone(),
                message: e.to_string(),
            })?;

        for (index, lines) in pages.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) = doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
                doc.get_page(page).get_layer(layer)
            };
            for line in lines {
                layer.use_text(line.text.as_str(), line.size, Mm(MARGIN), Mm(line.y), &font);
            }
        }

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| RenderError::encode("pdf", e))?;
        buf.into_inner()
            .map_err(|e| RenderError::encode("pdf", e))
    }
}

/// Advance widths from the embedded font.
struct FontMetrics<'a> {
    face: Face<'a>,
    units_per_em: f32,
    fallback_advance: u16,
}

impl<'a> FontMetrics<'a> {
    fn new(face: Face<'a>) -> Self {
        let units_per_em = f32::from(face.units_per_em().max(1));
        // Glyphs the font lacks render as .notdef; count them a full em wide.
        let fallback_advance = face.units_per_em();
        Self {
            face,
            units_per_em,
            fallback_advance,
        }
    }

    fn width_mm(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text
            .chars()
            .map(|c| {
                self.face
                    .glyph_index(c)
                    .and_then(|id| self.face.glyph_hor_advance(id))
                    .unwrap_or(self.fallback_advance)
            })
            .map(u32::from)
            .sum();
        units as f32 / self.units_per_em * size * MM_PER_PT
    }
}

/// One line of text placed on a page.
#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    text: String,
    size: f32,
    y: f32,
}

/// Split the heading and report into pages of positioned lines, wrapping
/// every line to the text width. Empty report lines keep their vertical
/// space but produce no text.
fn layout(
    report_text: &str,
    heading: &str,
    measure: impl Fn(&str, f32) -> f32,
) -> Vec<Vec<PlacedLine>> {
    let mut pages = vec![Vec::new()];
    let mut y = PAGE_HEIGHT.0 - MARGIN;

    let mut place = |text: String, size: f32, y: &mut f32| {
        if *y < MARGIN + LINE_HEIGHT {
            pages.push(Vec::new());
            *y = PAGE_HEIGHT.0 - MARGIN;
        }
        if !text.is_empty() {
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine { text, size, y: *y });
            }
        }
        *y -= LINE_HEIGHT;
    };

    for line in wrap_text(heading, TEXT_WIDTH, |s| measure(s, HEADING_SIZE)) {
        place(line, HEADING_SIZE, &mut y);
    }
    y -= LINE_HEIGHT / 2.0;

    for line in report_text.lines() {
        for wrapped in wrap_text(line, TEXT_WIDTH, |s| measure(s, BODY_SIZE)) {
            place(wrapped, BODY_SIZE, &mut y);
        }
    }

    pages
}

/// Greedy word wrap so that `measure(line) <= max_width` for every line;
/// words wider than a line are split between characters.
fn wrap_text(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        for c in word.chars() {
            current.push(c);
            if measure(&current) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::replace(&mut current, c.to_string()));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
