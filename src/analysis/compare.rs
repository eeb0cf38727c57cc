//! Pairwise channel comparison.
//!
//! For every unordered pair of channels with statistics, the reference
//! analyzer (if exactly one of the pair is it) becomes the baseline and the
//! other channel is measured against it.

use std::fmt;

use log::debug;
use serde::Serialize;

use super::range::ExtractedChannel;
use super::stats::ChannelStatistics;
use crate::config::ScaleConfig;

// ---------------------------------------------------------------------------
// Metric – a statistic that may be undefined
// ---------------------------------------------------------------------------

/// A statistic that can be explicitly undefined (zero baseline, too few
/// points). Serializes as a number or `null`; displays as `N/A`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "Option<f64>")]
pub enum Metric {
    Value(f64),
    Undefined,
}

impl Metric {
    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Undefined => None,
        }
    }

    pub fn is_undefined(self) -> bool {
        self == Metric::Undefined
    }

    fn from_finite(v: f64) -> Self {
        if v.is_finite() {
            Metric::Value(v)
        } else {
            Metric::Undefined
        }
    }
}

impl From<Metric> for Option<f64> {
    fn from(m: Metric) -> Self {
        m.value()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, f.precision()) {
            (Metric::Value(v), Some(p)) => write!(f, "{v:.p$}"),
            (Metric::Value(v), None) => write!(f, "{v}"),
            (Metric::Undefined, _) => write!(f, "N/A"),
        }
    }
}

// ---------------------------------------------------------------------------
// ComparisonResult
// ---------------------------------------------------------------------------

/// Comparison of one channel pair over a selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub baseline: String,
    pub comparand: String,
    pub baseline_mean: f64,
    pub comparand_mean: f64,
    pub baseline_count: usize,
    pub comparand_count: usize,
    /// `mean(comparand) - mean(baseline)`.
    pub diff_abs: f64,
    /// `diff_abs` as percent of the baseline mean.
    pub diff_pct: Metric,
    /// Pearson coefficient over jointly finite points.
    pub correlation: Metric,
    /// `diff_abs` as percent of the larger configured full scale.
    /// Absent when neither channel has a scale.
    pub reduced_error: Option<f64>,
    /// Accuracy class the reduced error is held against.
    pub permitted_error: Option<f64>,
}

impl ComparisonResult {
    /// Whether the reduced error stays within the accuracy class.
    pub fn within_accuracy(&self) -> Option<bool> {
        Some(self.reduced_error?.abs() <= self.permitted_error?)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Whether a channel name marks the reference analyzer.
pub fn is_reference(channel: &str, markers: &[String]) -> bool {
    let lower = channel.to_lowercase();
    markers.iter().any(|m| lower.contains(&m.to_lowercase()))
}

/// Relative difference; undefined on a zero baseline unless both are zero.
pub fn relative_difference(diff_abs: f64, base_mean: f64) -> Metric {
    if base_mean != 0.0 {
        Metric::from_finite(diff_abs / base_mean * 100.0)
    } else if diff_abs == 0.0 {
        Metric::Value(0.0)
    } else {
        Metric::Undefined
    }
}

/// Pearson correlation over the common prefix, restricted to positions
/// where both values are finite. Undefined for fewer than two such
/// positions or a constant input.
pub fn pearson(a: &[f64], b: &[f64]) -> Metric {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pairs.len() < 2 {
        return Metric::Undefined;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = var_a.sqrt() * var_b.sqrt();
    if denom == 0.0 {
        return Metric::Undefined;
    }
    match Metric::from_finite(cov / denom) {
        Metric::Value(r) => Metric::Value(r.clamp(-1.0, 1.0)),
        undefined => undefined,
    }
}

/// Compare every pair of channels, in first-encountered pair order.
///
/// `stats` holds only channels with at least one finite sample;
/// `extracted` supplies the raw in-range values for correlation.
pub fn compare_channels(
    stats: &[ChannelStatistics],
    extracted: &[ExtractedChannel],
    scales: Option<&ScaleConfig>,
    group: &str,
    reference_markers: &[String],
) -> Vec<ComparisonResult> {
    let values_of = |channel: &str| {
        extracted
            .iter()
            .find(|e| e.channel == channel)
            .map(|e| e.values.as_slice())
    };
    let scales = scales.filter(|s| s.has_group(group));

    let mut results = Vec::new();
    for (i, first) in stats.iter().enumerate() {
        for second in &stats[i + 1..] {
            let (base, other) = if !is_reference(&first.channel, reference_markers)
                && is_reference(&second.channel, reference_markers)
            {
                (second, first)
            } else {
                (first, second)
            };

            let diff_abs = other.mean - base.mean;
            let diff_pct = relative_difference(diff_abs, base.mean);

            let correlation = match (values_of(&base.channel), values_of(&other.channel)) {
                (Some(a), Some(b)) => pearson(a, b),
                _ => Metric::Undefined,
            };

            let (reduced_error, permitted_error) = match scales {
                Some(cfg) => {
                    let max_scale = [
                        cfg.scale(group, &base.channel),
                        cfg.scale(group, &other.channel),
                    ]
                    .into_iter()
                    .flatten()
                    .reduce(f64::max);
                    let reduced = max_scale.map(|s| diff_abs / s * 100.0);
                    let permitted = reduced.and(
                        cfg.accuracy_class(group, &other.channel)
                            .or_else(|| cfg.accuracy_class(group, &base.channel)),
                    );
                    (reduced, permitted)
                }
                None => (None, None),
            };

            debug!(
                "{group}: {} vs {}: diff {diff_abs:.4} ({diff_pct:.2}%), r = {correlation:.3}",
                other.channel, base.channel
            );

            results.push(ComparisonResult {
                baseline: base.channel.clone(),
                comparand: other.channel.clone(),
                baseline_mean: base.mean,
                comparand_mean: other.mean,
                baseline_count: base.count,
                comparand_count: other.count,
                diff_abs,
                diff_pct,
                correlation,
                reduced_error,
                permitted_error,
            });
        }
    }
    results
}
