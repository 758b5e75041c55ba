//! Cell and row model for schema-less spreadsheet data.
//!
//! Rows are plain maps from column name to a scalar [`Cell`]; different rows
//! in the same set may carry different keys. Column names beginning with
//! [`PROVENANCE_PREFIX`] are reserved for upload provenance and are excluded
//! from the inferred filter schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reserved prefix for provenance columns attached at ingestion time.
pub const PROVENANCE_PREFIX: &str = "_";

pub const COL_SOURCE_FILE: &str = "_source_file";
pub const COL_DATASET_NAME: &str = "_dataset_name";
pub const COL_UPLOAD_ID: &str = "_upload_id";
pub const COL_ROW_SEQ: &str = "_row_seq";
pub const COL_COMPANY_NAME: &str = "_company_name";
pub const COL_REPORT_PERIOD: &str = "_report_period";
pub const COL_FISCAL_YEAR: &str = "_fiscal_year";

/// A single scalar value as found in a spreadsheet cell.
///
/// Serializes to the natural JSON scalar, so a `Vec<Row>` round-trips through
/// the store's `file_data` payload unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

pub type Row = BTreeMap<String, Cell>;

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric view of the cell: `Number` if finite, or a string that parses
    /// to a finite number. Booleans and everything else are non-numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Canonical string representation used for select options, membership
    /// tests, and table rendering. Whole floats drop the fractional part so
    /// `2023.0` and `"2023"` agree.
    pub fn display(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// True when the column name belongs to upload provenance rather than data.
pub fn is_provenance_column(name: &str) -> bool {
    name.starts_with(PROVENANCE_PREFIX)
}

static NULL_CELL: Cell = Cell::Null;

/// Fetches a column from a row, treating a missing key as null.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a Cell {
    row.get(column).unwrap_or(&NULL_CELL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_number_accepts_numeric_text() {
        assert_eq!(Cell::Number(5.0).as_number(), Some(5.0));
        assert_eq!(Cell::Text(" 12.5 ".into()).as_number(), Some(12.5));
        assert_eq!(Cell::Text("n/a".into()).as_number(), None);
        assert_eq!(Cell::Bool(true).as_number(), None);
        assert_eq!(Cell::Null.as_number(), None);
    }

    #[test]
    fn as_number_rejects_non_finite() {
        assert_eq!(Cell::Number(f64::NAN).as_number(), None);
        assert_eq!(Cell::Text("inf".into()).as_number(), None);
    }

    #[test]
    fn display_collapses_whole_floats() {
        assert_eq!(Cell::Number(2023.0).display(), "2023");
        assert_eq!(Cell::Number(16.8).display(), "16.8");
        assert_eq!(Cell::Null.display(), "");
    }

    #[test]
    fn cells_round_trip_through_json_scalars() {
        let row: Row = [
            ("Company".to_string(), Cell::from("A")),
            ("Revenue".to_string(), Cell::from(5_000_000.0)),
            ("Audited".to_string(), Cell::Bool(true)),
            ("Notes".to_string(), Cell::Null),
        ]
        .into_iter()
        .collect();

        let encoded = serde_json::to_string(&row).expect("encode row");
        assert!(encoded.contains("\"Notes\":null"));
        let decoded: Row = serde_json::from_str(&encoded).expect("decode row");
        assert_eq!(decoded, row);
    }

    #[test]
    fn provenance_columns_are_recognized() {
        assert!(is_provenance_column(COL_SOURCE_FILE));
        assert!(is_provenance_column("_row_seq"));
        assert!(!is_provenance_column("Revenue"));
    }
}
