//! tdcompare-render - Report rendering for tdcompare.
//!
//! Turns comparison report text into downloadable documents:
//!
//! - **txt** - the text verbatim
//! - **docx** - heading, a real table for `|`-separated rows, then prose
//! - **pdf** - wrapped lines on A4 pages with an embedded TrueType font
//!
//! Each rendered document lives in a temp file that is deleted when the
//! [`RenderedDocument`] is dropped.
//!
//! # Example
//!
//! ```ignore
//! use tdcompare_render::{DocumentLabels, OutputFormat, ReportRenderer};
//!
//! let renderer = ReportRenderer::new(OutputFormat::ALL.to_vec(), "MyDejaVuSans.ttf")?;
//! let labels = DocumentLabels::new("AI comparative analysis", "AI_Comparison");
//! let doc = renderer.render(&report, OutputFormat::Docx, &labels).await?;
//! messenger.send_document(chat, doc.file_name(), doc.path()).await?;
//! ```

mod docx;
mod error;
mod output;
mod pdf;
mod renderer;
pub mod table;

pub use error::{RenderError, RenderResult};
pub use output::{DocumentLabels, OutputFormat, RenderedDocument};
pub use pdf::PdfRenderer;
pub use renderer::ReportRenderer;
pub use table::{ComparisonTable, ReportLayout};
