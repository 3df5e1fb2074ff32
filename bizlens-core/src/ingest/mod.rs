//! Tabular input parsing
//!
//! Turns raw pasted or uploaded text into a [`Table`]. The transport that
//! delivered the text (file upload, clipboard, extraction from a PDF or
//! spreadsheet) is outside this crate; by the time input reaches here it is
//! delimiter-separated text.
//!
//! Parsing rules:
//! - Code fences and carriage returns are stripped; blank lines and
//!   elision markers ("... (") are dropped.
//! - The first line is the header row.
//! - Each cell is independently parsed as a number after removing currency
//!   symbols and thousands separators; cells that fail numeric parsing stay
//!   text. Type is per cell, never per column.
//! - Rows whose cell count differs from the header count are dropped and
//!   counted, never aborting the parse.

use crate::error::{Error, Result};
use crate::types::{Cell, Table};

/// Characters removed from a cell before attempting numeric parsing.
const CURRENCY_CHARS: &[char] = &['$', '₹', ','];

/// Parse delimiter-separated text into a [`Table`].
///
/// Requires a header line plus at least one valid data row.
pub fn parse_table(raw: &str) -> Result<Table> {
    let cleaned = raw
        .trim()
        .replace("```csv", "")
        .replace("```", "")
        .replace('\r', "");

    let lines: Vec<&str> = cleaned
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.contains("... ("))
        .collect();

    if lines.len() < 2 {
        return Err(Error::Parse(
            "input needs at least a header row and one data row".to_string(),
        ));
    }

    let headers: Vec<String> = lines[0]
        .split(',')
        .map(|h| h.trim().replace('"', ""))
        .collect();

    let mut rows = Vec::new();
    let mut skipped_rows = 0usize;

    for line in &lines[1..] {
        let row: Vec<Cell> = line.split(',').map(parse_cell).collect();

        if row.len() == headers.len() {
            rows.push(row);
        } else {
            skipped_rows += 1;
        }
    }

    if rows.is_empty() {
        return Err(Error::Parse(
            "no valid data rows found after parsing".to_string(),
        ));
    }

    tracing::debug!(
        rows = rows.len(),
        skipped = skipped_rows,
        columns = headers.len(),
        "Parsed tabular input"
    );

    Ok(Table {
        headers,
        rows,
        skipped_rows,
    })
}

/// Parse one raw cell: trim, strip quotes, then try numeric with currency
/// symbols removed.
fn parse_cell(raw: &str) -> Cell {
    let cleaned = raw.trim().replace('"', "");
    let candidate: String = cleaned
        .chars()
        .filter(|c| !CURRENCY_CHARS.contains(c))
        .collect();

    match candidate.parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::Number(n),
        _ => Cell::Text(cleaned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_csv() {
        let table = parse_table("Month,Revenue\nJan,50000\nFeb,60000\n").unwrap();
        assert_eq!(table.headers, vec!["Month", "Revenue"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.skipped_rows, 0);
        assert_eq!(table.rows[0][0], Cell::Text("Jan".to_string()));
        assert_eq!(table.rows[0][1], Cell::Number(50000.0));
    }

    #[test]
    fn test_malformed_rows_are_skipped_and_counted() {
        let table = parse_table("A,B\n1,2\nonly-one-cell\n3,4\n").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.skipped_rows, 1);
    }

    #[test]
    fn test_currency_symbols_become_numbers() {
        let table = parse_table("Item,Price\nWidget,\"$1200\"\nGadget,₹500\n").unwrap();
        assert_eq!(table.rows[0][1], Cell::Number(1200.0));
        assert_eq!(table.rows[1][1], Cell::Number(500.0));
    }

    #[test]
    fn test_code_fences_and_elision_markers_ignored() {
        let raw = "```csv\nA,B\n1,2\n... (300 more rows) ...\n3,4\n```";
        let table = parse_table(raw).unwrap();
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_header_only_is_an_error() {
        assert!(parse_table("A,B\n").is_err());
    }

    #[test]
    fn test_all_rows_malformed_is_an_error() {
        assert!(parse_table("A,B\n1\n2\n").is_err());
    }

    #[test]
    fn test_mixed_column_stays_per_cell() {
        let table = parse_table("Label,Value\nx,10\ny,n/a\n").unwrap();
        assert!(table.rows[0][1].is_number());
        assert!(!table.rows[1][1].is_number());
    }
}
