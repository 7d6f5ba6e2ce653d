//! Detection of the comparison table embedded in report text.
//!
//! A line is a table row when it contains the column separator `|`. The
//! first row is the header; later rows are cut or padded to the header's
//! width. Markdown divider rows (`|---|:--:|`) carry no data and are
//! dropped. Every other non-blank line, including lines made only of
//! separators, is kept in order as a trailing paragraph.
//!
//! This is a heuristic: prose that happens to contain `|` is read as a row.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Column separator recognised in report text.
pub const COLUMN_SEPARATOR: char = '|';

static DIVIDER_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:?-{2,}:?$").expect("valid divider regex"));

/// Rectangular table parsed out of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonTable {
    pub headers: Vec<String>,
    /// Each row has exactly `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
}

/// Report text split into an optional table and its surrounding prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLayout {
    pub table: Option<ComparisonTable>,
    /// With a table: the non-table lines in original order, blank lines
    /// dropped. Without one: every line of the report.
    pub paragraphs: Vec<String>,
}

impl ReportLayout {
    /// Split report text into table and paragraphs.
    pub fn parse(text: &str) -> Self {
        let mut table: Option<ComparisonTable> = None;
        let mut prose: Vec<String> = Vec::new();

        for line in text.lines() {
            if !line.contains(COLUMN_SEPARATOR) {
                if !line.trim().is_empty() {
                    prose.push(line.trim_end().to_string());
                }
                continue;
            }

            let cells = split_row(line);
            if is_divider(&cells) {
                continue;
            }
            if cells.iter().all(|c| c.is_empty()) {
                prose.push(line.trim_end().to_string());
                continue;
            }

            match table.as_mut() {
                None => {
                    table = Some(ComparisonTable {
                        headers: cells,
                        rows: Vec::new(),
                    })
                }
                Some(t) => {
                    let width = t.headers.len();
                    let mut row = cells;
                    row.resize(width, String::new());
                    t.rows.push(row);
                }
            }
        }

        match table {
            Some(table) => Self {
                table: Some(table),
                paragraphs: prose,
            },
            None => Self {
                table: None,
                paragraphs: text.lines().map(|l| l.trim_end().to_string()).collect(),
            },
        }
    }
}

/// Split a row on the separator, ignoring the optional outer pipes of
/// markdown tables.
fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix(COLUMN_SEPARATOR).unwrap_or(trimmed);
    let inner = inner.strip_suffix(COLUMN_SEPARATOR).unwrap_or(inner);

    inner
        .split(COLUMN_SEPARATOR)
        .map(|cell| cell.trim().to_string())
        .collect()
}

fn is_divider(cells: &[String]) -> bool {
    cells.iter().any(|c| !c.is_empty())
        && cells
            .iter()
            .all(|c| c.is_empty() || DIVIDER_CELL.is_match(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_with_interleaved_prose() {
        let text = "Parameter | Document 1 | Document 2 | Match\n\
                    Voltage matches in both documents.\n\
                    Voltage | 5V | 5V | yes\n\
                    Current differs.\n\
                    Current | 2A | 3A | no";

        let layout = ReportLayout::parse(text);
        let table = layout.table.expect("table detected");

        assert_eq!(table.headers.len(), 4);
        assert_eq!(
            table.headers,
            vec!["Parameter", "Document 1", "Document 2", "Match"]
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["Current", "2A", "3A", "no"]);
        assert_eq!(
            layout.paragraphs,
            vec!["Voltage matches in both documents.", "Current differs."]
        );
    }

    #[test]
    fn test_markdown_table_divider_skipped() {
        let text = "| Parameter | Doc 1 | Doc 2 | Match |\n\
                    |-----------|:-----:|-------|-------|\n\
                    | Current | 2A | 3A | ❌ |";

        let layout = ReportLayout::parse(text);
        let table = layout.table.unwrap();
        assert_eq!(table.headers, vec!["Parameter", "Doc 1", "Doc 2", "Match"]);
        assert_eq!(table.rows, vec![vec!["Current", "2A", "3A", "❌"]]);
        assert!(layout.paragraphs.is_empty());
    }

    #[test]
    fn test_ragged_rows_truncated_and_padded() {
        let text = "A | B\n1 | 2 | 3 | 4\nonly";
        // "only" has no separator, so it is prose
        let layout = ReportLayout::parse(text);
        let table = layout.table.unwrap();
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
        assert_eq!(layout.paragraphs, vec!["only"]);

        let layout = ReportLayout::parse("A | B | C\nx |");
        let table = layout.table.unwrap();
        assert_eq!(table.rows, vec![vec!["x", "", ""]]);
    }

    #[test]
    fn test_no_table_keeps_all_lines() {
        let text = "Summary\n\nBoth documents describe the same device.";
        let layout = ReportLayout::parse(text);
        assert!(layout.table.is_none());
        assert_eq!(
            layout.paragraphs,
            vec!["Summary", "", "Both documents describe the same device."]
        );
    }

    #[test]
    fn test_separator_only_lines_do_not_start_table() {
        let layout = ReportLayout::parse("|\n| |\nplain");
        assert!(layout.table.is_none());
    }

    #[test]
    fn test_separator_only_lines_kept_as_prose_beside_table() {
        let layout = ReportLayout::parse("A | B\n| |\n1 | 2\n|");
        let table = layout.table.unwrap();
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
        assert_eq!(layout.paragraphs, vec!["| |", "|"]);
    }
}
