//! Locale-tolerant numeric coercion.
//!
//! Coercion never fails: anything that does not read as a number becomes
//! `NaN`, the in-band missing marker of every value vector in this crate.

use crate::data::model::CellValue;

/// Convert one raw cell to a float, `NaN` when it does not parse.
pub fn coerce_cell(value: &CellValue) -> f64 {
    match value {
        CellValue::Null => f64::NAN,
        CellValue::Float(v) => *v,
        CellValue::Integer(i) => *i as f64,
        CellValue::Bool(b) => f64::from(u8::from(*b)),
        CellValue::Text(s) => coerce_str(s),
        other => coerce_str(&other.to_string()),
    }
}

/// Trim, turn every `,` into `.`, and parse.
pub fn coerce_str(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return f64::NAN;
    }
    if trimmed.contains(',') {
        trimmed.replace(',', ".").parse().unwrap_or(f64::NAN)
    } else {
        trimmed.parse().unwrap_or(f64::NAN)
    }
}

/// Coerce a whole column. The output is position-aligned with the input.
pub fn coerce_column<'a, I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    values.into_iter().map(coerce_cell).collect()
}

/// Whether a non-blank cell fails to coerce (a malformed value).
pub fn is_malformed(value: &CellValue) -> bool {
    !value.is_blank() && coerce_cell(value).is_nan()
}
