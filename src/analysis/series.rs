//! Channel series aligned on a time or row-number axis.

use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::Serialize;

use super::coerce::coerce_column;
use super::datetime::ParsedTimestamps;
use super::outliers::suppress_sentinels;
use crate::data::model::{ColumnRole, RawTable};

/// Position key of an instant: Unix seconds with millisecond precision.
pub fn instant_position(instant: NaiveDateTime) -> f64 {
    instant.and_utc().timestamp_millis() as f64 / 1000.0
}

// ---------------------------------------------------------------------------
// TimeSeries – per-channel values aligned on a shared position axis
// ---------------------------------------------------------------------------

/// Units of the position axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Axis {
    /// Unix seconds derived from parsed timestamps.
    Time,
    /// Row numbers; used when no timestamp resolved.
    Index,
}

/// One channel's coerced (and optionally suppressed) values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// All channels of one group, sorted ascending by position.
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    pub axis: Axis,
    pub positions: Vec<f64>,
    /// Instant per point; empty on an `Index` axis.
    pub instants: Vec<NaiveDateTime>,
    /// Source table row of each point.
    pub rows: Vec<usize>,
    pub channels: Vec<ChannelSeries>,
    /// Rows removed because their timestamp did not parse.
    pub dropped_rows: usize,
}

/// Everything under a crosshair at one position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readout {
    pub row: usize,
    pub position: f64,
    pub instant: Option<NaiveDateTime>,
    pub values: Vec<(String, f64)>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelSeries> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// The point nearest to `position`; ties go to the lowest row.
    pub fn nearest(&self, position: f64) -> Option<Readout> {
        if self.positions.is_empty() || position.is_nan() {
            return None;
        }
        let after = self.positions.partition_point(|&p| p < position);
        let idx = match (after.checked_sub(1), self.positions.get(after)) {
            (Some(before), Some(&next)) => {
                if position - self.positions[before] <= next - position {
                    self.run_start(before)
                } else {
                    after
                }
            }
            (Some(before), None) => self.run_start(before),
            (None, _) => after,
        };

        Some(Readout {
            row: self.rows[idx],
            position: self.positions[idx],
            instant: self.instants.get(idx).copied(),
            values: self
                .channels
                .iter()
                .map(|c| (c.name.clone(), c.values[idx]))
                .collect(),
        })
    }

    /// First index sharing the position of `idx`. Sorting is stable, so it
    /// holds the lowest row among duplicates.
    fn run_start(&self, idx: usize) -> usize {
        let position = self.positions[idx];
        self.positions.partition_point(|&p| p < position)
    }
}

/// Build the series of one table.
///
/// With usable timestamps, rows whose instant did not resolve are dropped
/// and the rest are stable-sorted by instant before channel values are
/// coerced and suppressed. Without them, rows keep table order and are
/// keyed by row number.
pub fn build_series(
    table: &RawTable,
    role: &ColumnRole,
    timestamps: Option<&ParsedTimestamps>,
    suppress: bool,
) -> TimeSeries {
    let usable = timestamps.filter(|t| !t.is_fully_unresolved() && t.len() == table.len());

    let (axis, order, instants): (Axis, Vec<usize>, Vec<NaiveDateTime>) = match usable {
        Some(parsed) => {
            let mut keyed: Vec<(usize, NaiveDateTime)> = parsed
                .instants
                .iter()
                .enumerate()
                .filter_map(|(row, instant)| instant.map(|dt| (row, dt)))
                .collect();
            keyed.sort_by_key(|&(_, dt)| dt);
            let (order, instants) = keyed.into_iter().unzip();
            (Axis::Time, order, instants)
        }
        None => (Axis::Index, (0..table.len()).collect(), Vec::new()),
    };

    let dropped_rows = table.len() - order.len();
    if dropped_rows > 0 {
        warn!(
            "{}: {} rows with invalid time excluded",
            table.group, dropped_rows
        );
    }

    let positions: Vec<f64> = match axis {
        Axis::Time => instants.iter().map(|&dt| instant_position(dt)).collect(),
        Axis::Index => order.iter().map(|&row| row as f64).collect(),
    };

    let channels = role
        .data_columns
        .iter()
        .map(|name| {
            let cells = order.iter().map(|&row| table.cell(row, name));
            let numeric = coerce_column(cells);
            let values = if suppress {
                suppress_sentinels(&numeric)
            } else {
                numeric
            };
            ChannelSeries {
                name: name.clone(),
                values,
            }
        })
        .collect();

    debug!(
        "{}: series of {} points on {:?} axis",
        table.group,
        positions.len(),
        axis
    );

    TimeSeries {
        axis,
        positions,
        instants,
        rows: order,
        channels,
        dropped_rows,
    }
}
