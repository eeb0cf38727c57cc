use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, RawTable, Row};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load one instrument group's export from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – header row; `;`, `,` or tab delimited (sniffed)
/// * `.json`         – `[{ "DateTime": "...", "Ametek": 5.2, ... }, ...]`
/// * `.parquet`      – any flat schema of text, numeric, bool or timestamp columns
pub fn load_file(path: &Path, group: &str) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, group),
        "json" => load_json(path, group),
        "csv" | "txt" => load_csv(path, group),
        other => bail!("Unsupported file extension: .{other}"),
    }?;

    info!(
        "loaded {} ({} rows, {} columns) from {}",
        group,
        table.len(),
        table.column_names.len(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one reading per row.
/// Exports from Russian-locale spreadsheets use `;` with comma decimals,
/// so the delimiter is taken from whichever candidate dominates the header.
fn load_csv(path: &Path, group: &str) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading CSV file")?;
    parse_csv(&text, group)
}

/// Parse CSV text into a table. Exposed for callers that already hold the bytes.
pub fn parse_csv(text: &str, group: &str) -> Result<RawTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let header_line = text.lines().next().unwrap_or("");
    let delimiter = sniff_delimiter(header_line);
    debug!("CSV delimiter for {group}: {:?}", delimiter as char);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = dedup_column_names(
        reader
            .headers()
            .context("reading CSV headers")?
            .iter()
            .map(|h| h.trim().to_string()),
    );

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(col_idx, name)| {
                let value = record
                    .get(col_idx)
                    .map(guess_cell_type)
                    .unwrap_or(CellValue::Null);
                (name.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    Ok(RawTable::new(group, headers, rows))
}

/// Repeated names get a `.1`, `.2`, ... suffix so every column keeps its own key.
fn dedup_column_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for name in names {
        let mut candidate = name.clone();
        let mut n = 0;
        while unique.contains(&candidate) {
            n += 1;
            candidate = format!("{name}.{n}");
        }
        if n > 0 {
            warn!("duplicate column '{name}' renamed to '{candidate}'");
        }
        unique.push(candidate);
    }
    unique
}

fn sniff_delimiter(header_line: &str) -> u8 {
    let count = |c: char| header_line.chars().filter(|&h| h == c).count();
    let (semicolons, commas, tabs) = (count(';'), count(','), count('\t'));
    if tabs > semicolons && tabs > commas {
        b'\t'
    } else if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Keep the cell close to what a spreadsheet reader would produce.
/// Comma-decimal text such as `"5,23"` stays text; coercion handles it later.
fn guess_cell_type(s: &str) -> CellValue {
    if s.trim().is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "DateTime": "22.11.2025 16:20", "Ametek": 5.2, "ЭкоСпектр": "5,23" },
///   ...
/// ]
/// ```
///
/// Column order follows the first record, then any new keys in encounter order.
fn load_json(path: &Path, group: &str) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text, group)
}

/// Parse records-oriented JSON text into a table.
pub fn parse_json(text: &str, group: &str) -> Result<RawTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut column_names: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut row = Row::new();
        for (key, val) in obj {
            if !column_names.contains(key) {
                column_names.push(key.clone());
            }
            row.insert(key.clone(), json_to_cell(val));
        }
        rows.push(row);
    }

    Ok(RawTable::new(group, column_names, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by Pandas (`df.to_parquet()`) or Polars.
/// Every column becomes a table column; nested types are stringified.
fn load_parquet(path: &Path, group: &str) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let column_names =
        dedup_column_names(builder.schema().fields().iter().map(|f| f.name().clone()));
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row_idx in 0..batch.num_rows() {
            let row: Row = column_names
                .iter()
                .enumerate()
                .map(|(col_idx, name)| {
                    (name.clone(), extract_cell(batch.column(col_idx), row_idx))
                })
                .collect();
            rows.push(row);
        }
    }

    Ok(RawTable::new(group, column_names, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let datetime = |dt: Option<chrono::NaiveDateTime>| {
        dt.map(CellValue::DateTime).unwrap_or(CellValue::Null)
    };

    match col.data_type() {
        DataType::Utf8 => CellValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        DataType::Date32 => datetime(col.as_primitive::<Date32Type>().value_as_datetime(row)),
        DataType::Timestamp(unit, _) => datetime(match unit {
            TimeUnit::Second => col.as_primitive::<TimestampSecondType>().value_as_datetime(row),
            TimeUnit::Millisecond => {
                col.as_primitive::<TimestampMillisecondType>().value_as_datetime(row)
            }
            TimeUnit::Microsecond => {
                col.as_primitive::<TimestampMicrosecondType>().value_as_datetime(row)
            }
            TimeUnit::Nanosecond => {
                col.as_primitive::<TimestampNanosecondType>().value_as_datetime(row)
            }
        }),
        other => CellValue::Text(format!("{other:?}")),
    }
}
