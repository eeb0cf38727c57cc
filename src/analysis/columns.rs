//! Column-role classification.

use log::debug;

use super::coerce::coerce_cell;
use crate::data::model::{ColumnRole, RawTable};

/// Substrings that mark a timestamp column (matched case-insensitively).
pub const TIME_KEYWORDS: &[&str] = &["время", "time", "дата", "date", "timestamp", "datetime"];

/// Substrings that mark identifier columns which are never channels.
pub const EXCLUDE_KEYWORDS: &[&str] = &["tagname", "tag_name", "тег", "название"];

/// Non-blank cells inspected per column when deciding whether it is numeric.
const NUMERIC_SAMPLE: usize = 100;

/// Pick the timestamp column and the channel columns of a table.
///
/// The first column whose name contains a time keyword wins; without one,
/// the first column is assumed to hold time. A remaining column is a
/// channel unless it is an identifier column or none of its sampled
/// values coerce to a number.
pub fn classify_columns(table: &RawTable) -> ColumnRole {
    let Some(first) = table.column_names.first() else {
        return ColumnRole::default();
    };

    let time_column = table
        .column_names
        .iter()
        .find(|name| contains_any(name, TIME_KEYWORDS))
        .unwrap_or(first)
        .clone();

    let data_columns: Vec<String> = table
        .column_names
        .iter()
        .filter(|name| **name != time_column)
        .filter(|name| !contains_any(name, EXCLUDE_KEYWORDS))
        .filter(|name| has_numeric_sample(table, name))
        .cloned()
        .collect();

    debug!(
        "{}: time column {:?}, data columns {:?}",
        table.group, time_column, data_columns
    );

    ColumnRole {
        time_column: Some(time_column),
        data_columns,
    }
}

fn contains_any(name: &str, keywords: &[&str]) -> bool {
    let lower = name.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

fn has_numeric_sample(table: &RawTable, column: &str) -> bool {
    table
        .rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|cell| !cell.is_blank())
        .take(NUMERIC_SAMPLE)
        .any(|cell| !coerce_cell(cell).is_nan())
}
