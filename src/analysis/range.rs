//! Selection windows and per-channel extraction.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::series::{instant_position, TimeSeries};

// ---------------------------------------------------------------------------
// SelectionRange – the user-chosen window
// ---------------------------------------------------------------------------

/// A closed window `[start, end]` in position units: Unix seconds for
/// time-indexed series, row numbers for index-only series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectionRange {
    start: f64,
    end: f64,
}

impl SelectionRange {
    /// `None` unless both ends are finite and `start < end`.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        (start.is_finite() && end.is_finite() && start < end)
            .then_some(SelectionRange { start, end })
    }

    /// Window between two instants.
    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        SelectionRange::new(instant_position(start), instant_position(end))
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Inclusive at both ends.
    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position <= self.end
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// One channel's values inside a selection, missing markers included.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedChannel {
    pub channel: String,
    pub values: Vec<f64>,
}

impl ExtractedChannel {
    pub fn new(channel: impl Into<String>, values: Vec<f64>) -> Self {
        ExtractedChannel {
            channel: channel.into(),
            values,
        }
    }
}

/// Indices whose position lies inside the selection.
pub fn range_indices(positions: &[f64], range: &SelectionRange) -> Vec<usize> {
    positions
        .iter()
        .enumerate()
        .filter(|(_, p)| range.contains(**p))
        .map(|(i, _)| i)
        .collect()
}

/// Values whose position lies inside the selection.
///
/// Returns `None` ("no data") when the two sequences differ in length or
/// nothing is selected. Non-finite values are passed through unchanged.
pub fn extract_range(
    positions: &[f64],
    values: &[f64],
    range: &SelectionRange,
) -> Option<Vec<f64>> {
    if positions.len() != values.len() {
        return None;
    }
    let selected: Vec<f64> = range_indices(positions, range)
        .into_iter()
        .map(|i| values[i])
        .collect();
    (!selected.is_empty()).then_some(selected)
}

/// Extract every channel of a series. Channels without data are omitted.
pub fn extract_channels(series: &TimeSeries, range: &SelectionRange) -> Vec<ExtractedChannel> {
    series
        .channels
        .iter()
        .filter_map(|ch| {
            extract_range(&series.positions, &ch.values, range)
                .map(|values| ExtractedChannel::new(ch.name.clone(), values))
        })
        .collect()
}
