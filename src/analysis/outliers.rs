//! Sentinel dropout suppression.
//!
//! Analyzers report exactly `0` or `1` while their link is down. Those
//! readings are replaced by the last genuine reading of the same channel;
//! sentinels before the first genuine reading are left untouched.

fn is_sentinel(v: f64) -> bool {
    v == 0.0 || v == 1.0
}

/// Masked forward fill of sentinel values. Missing (`NaN`) entries are
/// neither replaced nor used as a fill source.
pub fn suppress_sentinels(values: &[f64]) -> Vec<f64> {
    let mut last_valid: Option<f64> = None;
    values
        .iter()
        .map(|&v| {
            if is_sentinel(v) {
                last_valid.unwrap_or(v)
            } else {
                if !v.is_nan() {
                    last_valid = Some(v);
                }
                v
            }
        })
        .collect()
}

/// Number of entries `suppress_sentinels` would change.
pub fn count_replaced(values: &[f64]) -> usize {
    let mut seen_valid = false;
    values
        .iter()
        .filter(|&&v| {
            if is_sentinel(v) {
                seen_valid
            } else {
                seen_valid |= !v.is_nan();
                false
            }
        })
        .count()
}
