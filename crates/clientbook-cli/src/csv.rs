// crates/clientbook-cli/src/csv.rs
// ============================================================================
// Module: CSV Codec
// Description: Record export to CSV and CSV parsing for record import.
// Purpose: Move client records in and out of spreadsheets.
// Dependencies: clientbook-core, thiserror
// ============================================================================

//! ## Overview
//! Export writes a header row (`id` followed by the schema keys in schema
//! order) and one row per record. Every cell is double-quoted with embedded
//! quotes doubled and rows are joined by `\n`.
//!
//! Import reads the whole document: the first non-blank row is the header,
//! blank rows are skipped, and cells may be quoted. Commas, doubled quotes,
//! and line breaks inside quotes are literal, so exported multi-line values
//! import back intact. Cells are trimmed. Only columns known to the schema are kept.
//! The `id` column is always dropped because imported rows become new
//! records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use clientbook_core::FieldDefinition;
use clientbook_core::FieldKey;
use clientbook_core::FieldValues;
use clientbook_core::Record;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header of the record identifier column.
pub const ID_HEADER: &str = "id";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CSV parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsvError {
    /// The input holds no header row.
    #[error("csv input has no header row")]
    MissingHeader,
    /// A quoted cell opened on the given line is never closed.
    #[error("unterminated quoted cell opened on line {0}")]
    UnterminatedQuote(usize),
}

// ============================================================================
// SECTION: Export
// ============================================================================

/// Renders records as CSV with the schema columns in schema order.
#[must_use]
pub fn export_records(fields: &[FieldDefinition], records: &[Record]) -> String {
    let mut rows = Vec::with_capacity(records.len() + 1);
    let header = std::iter::once(ID_HEADER).chain(fields.iter().map(|field| field.key.as_str()));
    rows.push(join_row(header));
    for record in records {
        let cells = std::iter::once(record.id.as_str())
            .chain(fields.iter().map(|field| record.value(&field.key)));
        rows.push(join_row(cells));
    }
    rows.join("\n")
}

/// Quotes every cell and joins them with commas.
fn join_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells.map(quote_cell).collect::<Vec<_>>().join(",")
}

/// Wraps a cell in quotes, doubling embedded quotes.
fn quote_cell(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// A parsed CSV document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    /// Header cells.
    pub header: Vec<String>,
    /// Data rows, in file order.
    pub rows: Vec<Vec<String>>,
}

/// Parses CSV text into a header and data rows.
///
/// # Errors
///
/// Returns [`CsvError`] when no header is present or a quote is left open.
pub fn parse(text: &str) -> Result<CsvTable, CsvError> {
    let mut parser = RowParser::default();
    let mut rows = Vec::new();
    let mut line_no = 1_usize;
    let mut open_quote_line = 0_usize;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if parser.in_quotes && chars.peek() == Some(&'"') => {
                parser.current.push('"');
                chars.next();
            }
            '"' => {
                if !parser.in_quotes {
                    open_quote_line = line_no;
                }
                parser.in_quotes = !parser.in_quotes;
                parser.blank = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                line_no += 1;
                if parser.in_quotes {
                    parser.current.push('\n');
                } else if let Some(row) = parser.finish_row() {
                    rows.push(row);
                }
            }
            ',' if !parser.in_quotes => {
                parser.finish_cell();
                parser.blank = false;
            }
            other => {
                parser.blank &= other.is_whitespace();
                parser.current.push(other);
            }
        }
    }
    if parser.in_quotes {
        return Err(CsvError::UnterminatedQuote(open_quote_line));
    }
    rows.extend(parser.finish_row());
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Err(CsvError::MissingHeader);
    };
    Ok(CsvTable {
        header,
        rows: rows.collect(),
    })
}

/// Cell and row accumulator for [`parse`].
struct RowParser {
    /// Completed cells of the current row.
    cells: Vec<String>,
    /// Cell being read.
    current: String,
    /// Whether the reader is inside a quoted cell.
    in_quotes: bool,
    /// Whether the current row holds only whitespace so far.
    blank: bool,
}

impl Default for RowParser {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            current: String::new(),
            in_quotes: false,
            blank: true,
        }
    }
}

impl RowParser {
    /// Closes the current cell, trimming it.
    fn finish_cell(&mut self) {
        self.cells.push(self.current.trim().to_string());
        self.current.clear();
    }

    /// Closes the current row; blank rows yield nothing.
    fn finish_row(&mut self) -> Option<Vec<String>> {
        let blank = std::mem::replace(&mut self.blank, true);
        if blank {
            self.cells.clear();
            self.current.clear();
            return None;
        }
        self.finish_cell();
        Some(std::mem::take(&mut self.cells))
    }
}

// ============================================================================
// SECTION: Import Planning
// ============================================================================

/// Rows ready to be created, plus the header columns that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
    /// Values for each new record; empty cells are omitted.
    pub rows: Vec<FieldValues>,
    /// Header columns unknown to the schema, in header order.
    pub ignored: Vec<String>,
}

/// Maps parsed rows onto the schema.
///
/// Missing trailing cells read as empty and extra cells are dropped. Rows
/// without any known non-empty value are skipped.
#[must_use]
pub fn plan_import(table: &CsvTable, fields: &[FieldDefinition]) -> ImportPlan {
    let mut ignored = Vec::new();
    let mut columns: Vec<(usize, FieldKey)> = Vec::new();
    for (index, name) in table.header.iter().enumerate() {
        if name == ID_HEADER {
            continue;
        }
        if let Some(field) = fields.iter().find(|field| field.key.as_str() == name) {
            if !columns.iter().any(|(_, key)| *key == field.key) {
                columns.push((index, field.key.clone()));
            }
        } else if !ignored.contains(name) {
            ignored.push(name.clone());
        }
    }

    let rows = table
        .rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .filter_map(|(index, key)| {
                    row.get(*index)
                        .filter(|value| !value.is_empty())
                        .map(|value| (key.clone(), value.clone()))
                })
                .collect::<FieldValues>()
        })
        .filter(|values| !values.is_empty())
        .collect();
    ImportPlan {
        rows,
        ignored,
    }
}
