//! Descriptive statistics over an extracted range.

use serde::Serialize;

use super::range::ExtractedChannel;

/// Statistics of one channel, over its finite values only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStatistics {
    pub channel: String,
    pub mean: f64,
    pub count: usize,
    /// Population standard deviation (divides by `n`).
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// Median of a slice, sorting it in place. `None` for an empty slice.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Statistics of a single value sequence; `None` without finite values.
pub fn describe(channel: &str, values: &[f64]) -> Option<ChannelStatistics> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let count = finite.len();
    if count == 0 {
        return None;
    }

    let n = count as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let median = median(&mut finite)?;

    Some(ChannelStatistics {
        channel: channel.to_string(),
        mean,
        count,
        std: variance.sqrt(),
        min,
        max,
        median,
    })
}

/// Statistics for every extracted channel, in input order. Channels with
/// no finite value are left out entirely.
pub fn aggregate(extracted: &[ExtractedChannel]) -> Vec<ChannelStatistics> {
    extracted
        .iter()
        .filter_map(|ch| describe(&ch.channel, &ch.values))
        .collect()
}
