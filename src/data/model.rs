use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue – a single cell of an instrument export
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, mirroring what spreadsheet and CSV exports hold.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Already-typed timestamp (Parquet / Arrow timestamp columns).
    DateTime(NaiveDateTime),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%d.%m.%Y %H:%M:%S")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Integer(v)
    }
}

impl CellValue {
    /// `Null`, or text made only of whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – one loaded export
// ---------------------------------------------------------------------------

/// One row: column name → raw cell. Absent keys read as `Null`.
pub type Row = BTreeMap<String, CellValue>;

/// An export of one instrument group (e.g. "H2S", "SO2"), as loaded.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Instrument group the table belongs to.
    pub group: String,
    /// Column names in file order.
    pub column_names: Vec<String>,
    /// Rows in file order.
    pub rows: Vec<Row>,
}

static NULL_CELL: CellValue = CellValue::Null;

impl RawTable {
    pub fn new(group: impl Into<String>, column_names: Vec<String>, rows: Vec<Row>) -> Self {
        RawTable {
            group: group.into(),
            column_names,
            rows,
        }
    }

    /// Build a table from positional rows; short rows are padded with `Null`.
    pub fn from_records(
        group: impl Into<String>,
        column_names: Vec<String>,
        records: Vec<Vec<CellValue>>,
    ) -> Self {
        let rows = records
            .into_iter()
            .map(|record| {
                let mut cells = record.into_iter();
                column_names
                    .iter()
                    .map(|name| (name.clone(), cells.next().unwrap_or(CellValue::Null)))
                    .collect()
            })
            .collect();
        RawTable::new(group, column_names, rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All cells of one column, in row order.
    pub fn column(&self, name: &str) -> Vec<&CellValue> {
        self.rows
            .iter()
            .map(|row| row.get(name).unwrap_or(&NULL_CELL))
            .collect()
    }

    /// One cell; `Null` if the row or column is missing.
    pub fn cell(&self, row: usize, column: &str) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL_CELL)
    }
}

// ---------------------------------------------------------------------------
// ColumnRole – classification of a table's schema
// ---------------------------------------------------------------------------

/// Which column holds timestamps and which hold instrument channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRole {
    pub time_column: Option<String>,
    pub data_columns: Vec<String>,
}
