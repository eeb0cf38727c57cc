/// Data layer: raw table types and the file loaders that produce them.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ RawTable  │  ordered columns, rows of CellValue
///   └──────────┘
///        │
///        ▼
///   analysis::*   (classification, coercion, statistics)
/// ```

pub mod loader;
pub mod model;
