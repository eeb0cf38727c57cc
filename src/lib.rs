//! Side-by-side comparison of two gas analyzers' time-series exports.
//!
//! Raw tables come in through [`data::loader`]; [`analysis`] normalizes
//! them and computes statistics over a selected window; [`state`] keeps
//! one session per instrument group and reruns the chain on demand.

pub mod analysis;
pub mod config;
pub mod data;
pub mod state;

pub use analysis::compare::{ComparisonResult, Metric};
pub use analysis::range::SelectionRange;
pub use analysis::stats::ChannelStatistics;
pub use config::{ChannelScale, ConfigError, EngineConfig, ScaleConfig};
pub use data::model::{CellValue, ColumnRole, RawTable};
pub use state::{GroupSession, SelectionReport, Workspace};
