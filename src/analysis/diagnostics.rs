//! Conversion diagnostics: which cells failed to coerce, how timestamps
//! were resolved, and how many dropout sentinels a channel carries.

use std::fmt;

use serde::Serialize;

use super::coerce::{coerce_column, is_malformed};
use super::datetime::{Convention, NumericUnit, ParsedTimestamps};
use super::outliers::count_replaced;
use crate::data::model::{ColumnRole, RawTable};

/// Malformed cells listed per column.
const MAX_EXAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDiagnostics {
    pub column: String,
    pub total: usize,
    pub blank: usize,
    pub malformed: usize,
    /// First malformed cells as `(row, raw text)`.
    pub examples: Vec<(usize, String)>,
    pub zeros: usize,
    pub ones: usize,
    /// Sentinels that suppression replaces, counted in table order.
    pub replaced: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestampDiagnostics {
    pub column: String,
    pub total: usize,
    pub unresolved: usize,
    pub convention: Convention,
    pub recovered: Vec<(String, usize)>,
    pub numeric_unit: Option<NumericUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDiagnostics {
    pub group: String,
    pub rows: usize,
    pub timestamps: Option<TimestampDiagnostics>,
    pub columns: Vec<ColumnDiagnostics>,
}

pub fn diagnose_column(table: &RawTable, column: &str) -> ColumnDiagnostics {
    let cells = table.column(column);
    let numeric = coerce_column(cells.iter().copied());

    let examples = cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| is_malformed(cell))
        .map(|(row, cell)| (row, cell.to_string()))
        .collect::<Vec<_>>();

    ColumnDiagnostics {
        column: column.to_string(),
        total: cells.len(),
        blank: cells.iter().filter(|c| c.is_blank()).count(),
        malformed: examples.len(),
        examples: examples.into_iter().take(MAX_EXAMPLES).collect(),
        zeros: numeric.iter().filter(|&&v| v == 0.0).count(),
        ones: numeric.iter().filter(|&&v| v == 1.0).count(),
        replaced: count_replaced(&numeric),
    }
}

pub fn diagnose(
    table: &RawTable,
    role: &ColumnRole,
    timestamps: Option<&ParsedTimestamps>,
) -> GroupDiagnostics {
    let timestamps = role
        .time_column
        .as_ref()
        .zip(timestamps)
        .map(|(column, parsed)| TimestampDiagnostics {
            column: column.clone(),
            total: parsed.len(),
            unresolved: parsed.unresolved,
            convention: parsed.convention,
            recovered: parsed
                .recovered
                .iter()
                .map(|(strategy, n)| (strategy.to_string(), *n))
                .collect(),
            numeric_unit: parsed.numeric_unit,
        });

    GroupDiagnostics {
        group: table.group.clone(),
        rows: table.len(),
        timestamps,
        columns: role
            .data_columns
            .iter()
            .map(|c| diagnose_column(table, c))
            .collect(),
    }
}

impl fmt::Display for GroupDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Group {} ({} rows)", self.group, self.rows)?;
        match &self.timestamps {
            Some(ts) => {
                writeln!(
                    f,
                    "  time column '{}': {} of {} unresolved ({:?})",
                    ts.column, ts.unresolved, ts.total, ts.convention
                )?;
                for (strategy, n) in &ts.recovered {
                    writeln!(f, "    {n:>6} via {strategy}")?;
                }
                if let Some(unit) = ts.numeric_unit {
                    writeln!(f, "    read as numeric {unit:?}")?;
                }
            }
            None => writeln!(f, "  no time column")?,
        }
        for c in &self.columns {
            writeln!(
                f,
                "  '{}': {} cells, {} blank, {} malformed, {} zeros, {} ones, {} replaced",
                c.column, c.total, c.blank, c.malformed, c.zeros, c.ones, c.replaced
            )?;
            for (row, raw) in &c.examples {
                writeln!(f, "    row {row}: '{raw}'")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::columns::classify_columns;
    use crate::analysis::datetime::parse_timestamps;
    use crate::data::model::CellValue;

    #[test]
    fn counts_blank_malformed_and_sentinels() {
        let table = RawTable::from_records(
            "H2S",
            vec!["DateTime".into(), "Ametek".into()],
            vec![
                vec!["22.11.2025 16:20".into(), "5,2".into()],
                vec!["22.11.2025 16:21".into(), "0".into()],
                vec!["22.11.2025 16:22".into(), " ".into()],
                vec!["oops".into(), "err".into()],
                vec!["22.11.2025 16:24".into(), CellValue::Integer(1)],
            ],
        );
        let role = classify_columns(&table);
        let parsed = parse_timestamps(table.column("DateTime"));
        let diag = diagnose(&table, &role, Some(&parsed));

        let ts = diag.timestamps.as_ref().unwrap();
        assert_eq!(ts.unresolved, 1);
        assert_eq!(ts.recovered, vec![("day-first".to_string(), 4)]);

        let col = &diag.columns[0];
        assert_eq!((col.total, col.blank, col.malformed), (5, 1, 1));
        assert_eq!(col.examples, vec![(3, "err".to_string())]);
        assert_eq!((col.zeros, col.ones, col.replaced), (1, 1, 2));

        let text = diag.to_string();
        assert!(text.contains("row 3: 'err'"));
    }
}
