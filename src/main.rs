use std::path::PathBuf;

use analyzer_compare::analysis::datetime::parse_timestamps;
use analyzer_compare::analysis::series::instant_position;
use analyzer_compare::data::loader::load_file;
use analyzer_compare::{
    CellValue, EngineConfig, ScaleConfig, SelectionRange, SelectionReport, Workspace,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

#[derive(Parser)]
#[command(name = "analyzer-compare")]
#[command(about = "Compare gas analyzer exports over a time window", version)]
struct Cli {
    /// Instrument group export as GROUP=PATH (e.g. H2S=h2s.csv); repeatable
    #[arg(short, long = "group", value_name = "GROUP=PATH", required = true)]
    groups: Vec<String>,

    /// JSON file with full-scale values and accuracy classes
    #[arg(short, long)]
    scales: Option<PathBuf>,

    /// JSON file with engine settings (reference markers, outlier filter)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window start: timestamp text, Unix seconds, or row index
    #[arg(long)]
    start: Option<String>,

    /// Window end: timestamp text, Unix seconds, or row index
    #[arg(long)]
    end: Option<String>,

    /// Keep 0/1 dropout readings as they are
    #[arg(long)]
    no_outlier_filter: bool,

    /// Print conversion diagnostics for every group
    #[arg(long)]
    diagnostics: bool,

    /// Emit the reports as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if cli.no_outlier_filter {
        config.outlier_filter = false;
    }
    let scales = match &cli.scales {
        Some(path) => ScaleConfig::load(path)
            .with_context(|| format!("loading scales {}", path.display()))?,
        None => ScaleConfig::default(),
    };

    let mut workspace = Workspace::new(scales, config);
    for spec in &cli.groups {
        let Some((group, path)) = spec.split_once('=') else {
            bail!("expected GROUP=PATH, got '{spec}'");
        };
        let table = load_file(&PathBuf::from(path), group)
            .with_context(|| format!("loading group {group}"))?;
        workspace.set_table(table);
    }

    if cli.diagnostics {
        for session in &workspace.sessions {
            println!("{}", session.diagnostics());
        }
    }

    let selection = selection(&workspace, cli.start.as_deref(), cli.end.as_deref())?;
    info!("selection [{}, {}]", selection.start(), selection.end());
    let reports = workspace.analyze(&selection);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }
    Ok(())
}

/// Parse a window bound: a plain number is a position, anything else a timestamp.
fn parse_bound(raw: &str) -> Result<f64> {
    if let Ok(v) = raw.trim().parse::<f64>() {
        return Ok(v);
    }
    let cell = CellValue::Text(raw.to_string());
    parse_timestamps([&cell]).instants[0]
        .map(instant_position)
        .with_context(|| format!("cannot read '{raw}' as a timestamp or number"))
}

/// Explicit bounds, or the full extent of every loaded series.
fn selection(
    workspace: &Workspace,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<SelectionRange> {
    let positions = workspace
        .sessions
        .iter()
        .flat_map(|s| s.series.positions.iter().copied());
    let (lo, hi) = positions.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p), hi.max(p))
    });

    let start = start.map(parse_bound).transpose()?.unwrap_or(lo);
    let end = end.map(parse_bound).transpose()?.unwrap_or(hi);
    SelectionRange::new(start, end)
        .with_context(|| format!("selection [{start}, {end}] must have start < end"))
}

fn print_report(report: &SelectionReport) {
    println!("== {} ==", report.group);
    if report.statistics.is_empty() {
        println!("  no data in selection");
        return;
    }
    println!(
        "  {:<20} {:>10} {:>7} {:>10} {:>10} {:>10} {:>10}",
        "channel", "mean", "n", "std", "min", "max", "median"
    );
    for s in &report.statistics {
        println!(
            "  {:<20} {:>10.4} {:>7} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            s.channel, s.mean, s.count, s.std, s.min, s.max, s.median
        );
    }
    for c in &report.comparisons {
        let reduced = c
            .reduced_error
            .map(|r| format!("{r:.2}%"))
            .unwrap_or_else(|| "-".to_string());
        let pct = match c.diff_pct.value() {
            Some(p) => format!("{p:+.2}%"),
            None => c.diff_pct.to_string(),
        };
        println!(
            "  {} - {}: diff {:+.4} ({}), r = {:.3}, reduced error {}",
            c.comparand, c.baseline, c.diff_abs, pct, c.correlation, reduced
        );
        if let Some(ok) = c.within_accuracy() {
            println!("    within accuracy class: {}", if ok { "yes" } else { "no" });
        }
    }
}
