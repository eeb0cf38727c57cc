use log::{debug, info};
use serde::Serialize;

use crate::analysis::columns::classify_columns;
use crate::analysis::compare::{compare_channels, ComparisonResult};
use crate::analysis::datetime::{parse_timestamps, ParsedTimestamps};
use crate::analysis::diagnostics::{diagnose, GroupDiagnostics};
use crate::analysis::range::{extract_channels, SelectionRange};
use crate::analysis::series::{build_series, Readout, TimeSeries};
use crate::analysis::stats::{aggregate, ChannelStatistics};
use crate::config::{EngineConfig, ScaleConfig};
use crate::data::model::{ColumnRole, RawTable};

// ---------------------------------------------------------------------------
// Per-selection output
// ---------------------------------------------------------------------------

/// Statistics and comparisons of one group over one selection.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionReport {
    pub group: String,
    pub selection: SelectionRange,
    pub statistics: Vec<ChannelStatistics>,
    pub comparisons: Vec<ComparisonResult>,
}

// ---------------------------------------------------------------------------
// GroupSession – one loaded instrument group
// ---------------------------------------------------------------------------

/// State of one instrument group, independent of rendering.
pub struct GroupSession {
    /// Loaded table, as read.
    pub table: RawTable,

    /// Column roles, computed once per load.
    pub role: ColumnRole,

    /// Parsed timestamps (None without a time column).
    pub timestamps: Option<ParsedTimestamps>,

    /// Current series; rebuilt when the outlier mode changes.
    pub series: TimeSeries,

    /// Whether dropout sentinels are suppressed in `series`.
    pub outlier_filter: bool,
}

impl GroupSession {
    /// Ingest a newly loaded table: classify, parse time, build the series.
    pub fn load(table: RawTable, outlier_filter: bool) -> Self {
        let role = classify_columns(&table);
        let timestamps = role
            .time_column
            .as_deref()
            .map(|col| parse_timestamps(table.column(col)));
        let series = build_series(&table, &role, timestamps.as_ref(), outlier_filter);

        info!(
            "{}: {} channels, {} points",
            table.group,
            role.data_columns.len(),
            series.len()
        );

        GroupSession {
            table,
            role,
            timestamps,
            series,
            outlier_filter,
        }
    }

    pub fn group(&self) -> &str {
        &self.table.group
    }

    /// Switch dropout suppression and rebuild the series if it changed.
    pub fn set_outlier_filter(&mut self, enabled: bool) {
        if enabled == self.outlier_filter {
            return;
        }
        self.outlier_filter = enabled;
        self.series = build_series(
            &self.table,
            &self.role,
            self.timestamps.as_ref(),
            enabled,
        );
        debug!("{}: outlier filter {}", self.group(), enabled);
    }

    /// Range → statistics → comparisons for one selection.
    pub fn analyze(
        &self,
        selection: &SelectionRange,
        scales: Option<&ScaleConfig>,
        config: &EngineConfig,
    ) -> SelectionReport {
        let extracted = extract_channels(&self.series, selection);
        let statistics = aggregate(&extracted);
        let comparisons = compare_channels(
            &statistics,
            &extracted,
            scales,
            self.group(),
            &config.reference_markers,
        );
        SelectionReport {
            group: self.group().to_string(),
            selection: *selection,
            statistics,
            comparisons,
        }
    }

    /// Values under a crosshair at `position`.
    pub fn readout(&self, position: f64) -> Option<Readout> {
        self.series.nearest(position)
    }

    pub fn diagnostics(&self) -> GroupDiagnostics {
        diagnose(&self.table, &self.role, self.timestamps.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Workspace – all groups plus shared configuration
// ---------------------------------------------------------------------------

/// Every loaded group, in load order, with the shared configuration.
#[derive(Default)]
pub struct Workspace {
    pub sessions: Vec<GroupSession>,
    pub scales: ScaleConfig,
    pub config: EngineConfig,
}

impl Workspace {
    pub fn new(scales: ScaleConfig, config: EngineConfig) -> Self {
        Workspace {
            sessions: Vec::new(),
            scales,
            config,
        }
    }

    /// Load or reload a group; a reload replaces the previous session.
    pub fn set_table(&mut self, table: RawTable) {
        let session = GroupSession::load(table, self.config.outlier_filter);
        match self
            .sessions
            .iter_mut()
            .find(|s| s.group() == session.group())
        {
            Some(existing) => *existing = session,
            None => self.sessions.push(session),
        }
    }

    pub fn session(&self, group: &str) -> Option<&GroupSession> {
        self.sessions.iter().find(|s| s.group() == group)
    }

    /// Toggle dropout suppression for every group.
    pub fn set_outlier_filter(&mut self, enabled: bool) {
        self.config.outlier_filter = enabled;
        for session in &mut self.sessions {
            session.set_outlier_filter(enabled);
        }
    }

    /// Analyze every group over the same selection.
    pub fn analyze(&self, selection: &SelectionRange) -> Vec<SelectionReport> {
        self.sessions
            .iter()
            .map(|s| s.analyze(selection, Some(&self.scales), &self.config))
            .collect()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}
