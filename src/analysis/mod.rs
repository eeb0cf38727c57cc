/// Normalization and comparison engine.
///
/// Pipeline:
/// ```text
///   RawTable ──▶ columns ──▶ datetime + coerce ──▶ outliers ──▶ series
///                                                                 │
///                                 (per selection)                 ▼
///                           compare ◀── stats ◀── range ◀── TimeSeries
/// ```
///
/// Nothing here performs I/O or keeps state between calls.

pub mod coerce;
pub mod columns;
pub mod compare;
pub mod datetime;
pub mod diagnostics;
pub mod outliers;
pub mod range;
pub mod series;
pub mod stats;
