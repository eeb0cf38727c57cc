use analyzer_compare::analysis::series::Axis;
use analyzer_compare::data::loader::parse_csv;
use analyzer_compare::{
    CellValue, ChannelScale, EngineConfig, GroupSession, RawTable, ScaleConfig, SelectionRange,
    Workspace,
};
use chrono::{NaiveDate, NaiveDateTime};

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 22)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Mixed time formats, comma decimals and 0/1 dropouts.
fn h2s_table() -> RawTable {
    let text = "\
DateTime;Ametek;ЭкоСпектр
22.11.2025 16:00;5,0;5,23
22.11.2025 16:01:00;0;5,3
22.11.2025 16:02;5,2;1
22.11.2025 16:03:00;5,4;5,6
22.11.2025 16:04;9,0;9,9
";
    parse_csv(text, "H2S").unwrap()
}

#[test]
fn selection_statistics_reflect_suppressed_values() {
    let mut workspace = Workspace::default();
    workspace.set_table(h2s_table());

    let session = workspace.session("H2S").unwrap();
    assert_eq!(session.role.data_columns, vec!["Ametek", "ЭкоСпектр"]);
    assert_eq!(session.series.axis, Axis::Time);
    assert_eq!(session.series.len(), 5);

    let selection = SelectionRange::between(at(16, 1), at(16, 3)).unwrap();
    let reports = workspace.analyze(&selection);
    assert_eq!(reports.len(), 1);
    let report = &reports[0];

    let ametek = &report.statistics[0];
    assert_eq!(ametek.channel, "Ametek");
    assert_eq!(ametek.count, 3);
    assert!(close(ametek.mean, 5.2));
    assert!(close(ametek.min, 5.0));

    let eco = &report.statistics[1];
    assert_eq!(eco.channel, "ЭкоСпектр");
    assert!(close(eco.mean, 5.4));
    assert!(close(eco.median, 5.3));

    let cmp = &report.comparisons[0];
    assert_eq!(cmp.baseline, "Ametek");
    assert_eq!(cmp.comparand, "ЭкоСпектр");
    assert!(close(cmp.diff_abs, 0.2));
    assert!(close(cmp.diff_pct.value().unwrap(), 0.2 / 5.2 * 100.0));
    assert!(cmp.correlation.value().is_some());
    assert_eq!(cmp.reduced_error, None);
}

#[test]
fn toggling_the_filter_restores_raw_readings() {
    let mut workspace = Workspace::default();
    workspace.set_table(h2s_table());
    workspace.set_outlier_filter(false);

    let selection = SelectionRange::between(at(16, 1), at(16, 3)).unwrap();
    let report = &workspace.analyze(&selection)[0];
    assert!(close(report.statistics[0].mean, (0.0 + 5.2 + 5.4) / 3.0));
    assert!(close(report.statistics[1].mean, (5.3 + 1.0 + 5.6) / 3.0));
    assert!(close(report.statistics[0].min, 0.0));
}

#[test]
fn reduced_error_from_scale_config() {
    let mut scales = ScaleConfig::default();
    scales
        .insert("H2S", "Ametek", ChannelScale::new(Some(10.0), Some(5.0)))
        .unwrap();
    let mut workspace = Workspace::new(scales, EngineConfig::default());
    workspace.set_table(h2s_table());

    let selection = SelectionRange::between(at(16, 0), at(16, 4)).unwrap();
    let report = &workspace.analyze(&selection)[0];
    let cmp = &report.comparisons[0];
    assert!(close(cmp.reduced_error.unwrap(), cmp.diff_abs / 10.0 * 100.0));
    assert_eq!(cmp.permitted_error, Some(5.0));
    assert_eq!(cmp.within_accuracy(), Some(true));
}

#[test]
fn empty_selection_yields_no_statistics() {
    let mut workspace = Workspace::default();
    workspace.set_table(h2s_table());
    let selection = SelectionRange::between(at(18, 0), at(19, 0)).unwrap();
    let report = &workspace.analyze(&selection)[0];
    assert!(report.statistics.is_empty());
    assert!(report.comparisons.is_empty());
}

#[test]
fn unparseable_time_uses_row_index() {
    let table = RawTable::from_records(
        "SO2",
        vec!["Time".into(), "ЭкоСпектр".into(), "Ametek".into()],
        vec![
            vec!["n/a".into(), "2,0".into(), "2,0".into()],
            vec!["n/a".into(), "4,0".into(), "3,0".into()],
            vec!["n/a".into(), "6,0".into(), "4,0".into()],
            vec!["n/a".into(), CellValue::Null, "5,0".into()],
        ],
    );
    let session = GroupSession::load(table, true);
    assert_eq!(session.series.axis, Axis::Index);
    assert!(session.diagnostics().timestamps.unwrap().unresolved == 4);

    let selection = SelectionRange::new(1.0, 3.0).unwrap();
    let report = session.analyze(&selection, None, &EngineConfig::default());

    let cmp = &report.comparisons[0];
    assert_eq!(cmp.baseline, "Ametek");
    assert_eq!(cmp.comparand, "ЭкоСпектр");
    assert!(close(cmp.diff_abs, 5.0 - 4.0));
    assert!(close(cmp.correlation.value().unwrap(), 1.0));
    assert_eq!(report.statistics[0].count, 2);
}

#[test]
fn zero_baseline_is_undefined_not_infinite() {
    let table = RawTable::from_records(
        "H2S",
        vec!["Date".into(), "Ametek".into(), "Other".into()],
        vec![
            vec!["22.11.2025 10:00".into(), "-1".into(), "2".into()],
            vec!["22.11.2025 10:01".into(), "1".into(), "4".into()],
        ],
    );
    let session = GroupSession::load(table, false);
    let selection = SelectionRange::between(at(10, 0), at(10, 1)).unwrap();
    let report = session.analyze(&selection, None, &EngineConfig::default());

    let cmp = &report.comparisons[0];
    assert_eq!(cmp.baseline_mean, 0.0);
    assert!(close(cmp.diff_abs, 3.0));
    assert!(cmp.diff_pct.is_undefined());
    assert_eq!(cmp.diff_pct.to_string(), "N/A");
}

#[test]
fn readout_and_reload() {
    let mut workspace = Workspace::default();
    workspace.set_table(h2s_table());

    let session = workspace.session("H2S").unwrap();
    let position = analyzer_compare::analysis::series::instant_position(at(16, 2));
    let readout = session.readout(position + 10.0).unwrap();
    assert_eq!(readout.row, 2);
    assert_eq!(readout.instant, Some(at(16, 2)));
    assert_eq!(readout.values[1], ("ЭкоСпектр".to_string(), 5.3));

    let smaller = parse_csv("DateTime;Ametek\n22.11.2025 16:00;3\n", "H2S").unwrap();
    workspace.set_table(smaller);
    assert_eq!(workspace.sessions.len(), 1);
    assert_eq!(workspace.session("H2S").unwrap().series.len(), 1);

    workspace.clear();
    assert!(workspace.session("H2S").is_none());
}
