//! Cascading timestamp parsing.
//!
//! Every strategy only sees rows that earlier strategies left unresolved,
//! and never overwrites a resolved row:
//!
//! ```text
//!  day-first ──(>30% unresolved)──▶ month-first (keep the better one)
//!      │
//!      ▼
//!  explicit formats, most specific first  (stop once all rows resolve)
//!      │
//!      ▼
//!  inferred formats
//!      │
//!      ▼
//!  whole column unresolved? → numeric epoch / spreadsheet serial
//! ```

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};
use serde::Serialize;

use super::coerce::coerce_column;
use super::stats::median;
use crate::data::model::CellValue;

/// Share of unresolved rows above which month-first parsing is also tried.
const MONTH_FIRST_THRESHOLD: f64 = 0.3;

/// Date-component order for ambiguous numeric dates such as `03.04.2025`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Convention {
    DayFirst,
    MonthFirst,
}

/// How a fully numeric timestamp column was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumericUnit {
    UnixMillis,
    UnixSeconds,
    /// Days since 1899-12-30, the spreadsheet epoch.
    SpreadsheetDays,
}

/// Whether the caller can use instants at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Every row has an instant.
    Full,
    /// Some rows resolved; the rest must be dropped.
    Partial { unresolved: usize },
    /// No row resolved; fall back to row-index positions.
    Unresolved,
}

/// Per-row parse result plus the diagnostics of how it was reached.
#[derive(Debug, Clone)]
pub struct ParsedTimestamps {
    pub instants: Vec<Option<NaiveDateTime>>,
    /// Rows still unresolved after every strategy.
    pub unresolved: usize,
    /// Convention chosen as the baseline for steps 1–2.
    pub convention: Convention,
    /// Rows resolved per strategy, in the order strategies ran.
    pub recovered: Vec<(Strategy, usize)>,
    /// Set when the numeric fallback resolved the column.
    pub numeric_unit: Option<NumericUnit>,
}

impl ParsedTimestamps {
    pub fn len(&self) -> usize {
        self.instants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }

    pub fn resolution(&self) -> Resolution {
        if self.unresolved == 0 && !self.instants.is_empty() {
            Resolution::Full
        } else if self.unresolved < self.instants.len() {
            Resolution::Partial {
                unresolved: self.unresolved,
            }
        } else {
            Resolution::Unresolved
        }
    }

    /// True when no row resolved (including an empty column).
    pub fn is_fully_unresolved(&self) -> bool {
        self.resolution() == Resolution::Unresolved
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One attempt function of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    /// Already-typed timestamp cells.
    Native,
    /// Generic numeric date with a fixed component order.
    Convention(Convention),
    /// Explicit `chrono` format with a time part.
    Format(&'static str),
    /// Explicit `chrono` format without a time part (midnight).
    DateOnly(&'static str),
    /// Broad list of common layouts (ISO 8601, RFC 2822, month names, AM/PM).
    Inferred,
}

/// Explicit formats tried on residual rows, most specific first.
pub const EXPLICIT_FORMATS: &[Strategy] = &[
    Strategy::Format("%d.%m.%Y %H:%M"),
    Strategy::Format("%d.%m.%Y %H:%M:%S"),
    Strategy::Format("%d/%m/%Y %H:%M:%S"),
    Strategy::Format("%d/%m/%Y %H:%M"),
    Strategy::Format("%Y-%m-%d %H:%M:%S"),
    Strategy::Format("%Y-%m-%d %H:%M"),
    Strategy::DateOnly("%d.%m.%Y"),
    Strategy::Format("%Y.%m.%d %H:%M:%S"),
    Strategy::Format("%d-%m-%Y %H:%M:%S"),
];

const INFERRED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%b %d %Y %H:%M:%S",
    "%Y%m%d%H%M%S",
    "%Y%m%dT%H%M%S",
];

const INFERRED_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%d %B %Y", "%d %b %Y", "%Y%m%d"];

impl Strategy {
    pub fn attempt(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        match self {
            Strategy::Native => None,
            Strategy::Convention(c) => parse_numeric_date(text, *c),
            Strategy::Format(fmt) => NaiveDateTime::parse_from_str(text, fmt).ok(),
            Strategy::DateOnly(fmt) => NaiveDate::parse_from_str(text, fmt)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN)),
            Strategy::Inferred => infer(text),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Native => write!(f, "typed timestamps"),
            Strategy::Convention(Convention::DayFirst) => write!(f, "day-first"),
            Strategy::Convention(Convention::MonthFirst) => write!(f, "month-first"),
            Strategy::Format(fmt) | Strategy::DateOnly(fmt) => write!(f, "format {fmt}"),
            Strategy::Inferred => write!(f, "inferred format"),
        }
    }
}

fn infer(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.naive_utc());
    }
    INFERRED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            INFERRED_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// `D.M.Y[ H:M[:S[.f]]]` (or `M.D.Y`) with `.`, `/` or `-` separators.
/// A four-digit leading component is always read as `Y-M-D`.
fn parse_numeric_date(text: &str, convention: Convention) -> Option<NaiveDateTime> {
    let (date_part, time_part) = match text.split_once([' ', 'T']) {
        Some((d, t)) => (d, Some(t.trim())),
        None => (text, None),
    };

    let sep = date_part.chars().find(|c| matches!(c, '.' | '/' | '-'))?;
    let fields: Vec<&str> = date_part.split(sep).collect();
    let [a, b, c] = fields.as_slice() else {
        return None;
    };
    if [a, b, c].iter().any(|f| f.is_empty() || !f.bytes().all(|x| x.is_ascii_digit())) {
        return None;
    }

    let (year, month, day) = if a.len() == 4 {
        (*a, *b, *c)
    } else {
        match convention {
            Convention::DayFirst => (*c, *b, *a),
            Convention::MonthFirst => (*c, *a, *b),
        }
    };

    let mut year: i32 = year.parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    let date = NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)?;

    let time = match time_part {
        None | Some("") => NaiveTime::MIN,
        Some(t) => parse_clock(t)?,
    };
    Some(date.and_time(time))
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    let mut parts = text.split(':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next()?.parse().ok()?;
    let (second, nano) = match parts.next() {
        None => (0, 0),
        Some(s) => match s.split_once('.') {
            None => (s.parse().ok()?, 0),
            Some((whole, frac)) => {
                let digits: String = frac.chars().take(9).collect();
                if digits.is_empty() || !digits.bytes().all(|x| x.is_ascii_digit()) {
                    return None;
                }
                let nano = digits.parse::<u32>().ok()? * 10u32.pow(9 - digits.len() as u32);
                (whole.parse().ok()?, nano)
            }
        },
    };
    if parts.next().is_some() {
        return None;
    }
    NaiveTime::from_hms_nano_opt(hour, minute, second, nano)
}

// ---------------------------------------------------------------------------
// Cascade
// ---------------------------------------------------------------------------

/// Run one strategy over the still-unresolved rows. Returns rows resolved.
fn apply_strategy(
    strategy: Strategy,
    texts: &[Option<&str>],
    instants: &mut [Option<NaiveDateTime>],
) -> usize {
    let mut resolved = 0;
    for (slot, text) in instants.iter_mut().zip(texts) {
        if slot.is_some() {
            continue;
        }
        if let Some(dt) = text.and_then(|t| strategy.attempt(t)) {
            *slot = Some(dt);
            resolved += 1;
        }
    }
    resolved
}

fn count_unresolved(instants: &[Option<NaiveDateTime>]) -> usize {
    instants.iter().filter(|i| i.is_none()).count()
}

/// Parse a raw timestamp column into instants.
pub fn parse_timestamps<'a, I>(cells: I) -> ParsedTimestamps
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let cells: Vec<&CellValue> = cells.into_iter().collect();
    let texts: Vec<Option<&str>> = cells
        .iter()
        .map(|cell| match cell {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    let native: Vec<Option<NaiveDateTime>> = cells
        .iter()
        .map(|cell| match cell {
            CellValue::DateTime(dt) => Some(*dt),
            _ => None,
        })
        .collect();
    let total = cells.len();
    let native_count = native.iter().flatten().count();

    let mut recovered = Vec::new();
    if native_count > 0 {
        recovered.push((Strategy::Native, native_count));
    }

    // Steps 1-2: one global convention, whichever leaves fewer rows unresolved.
    let mut instants = native.clone();
    let mut convention = Convention::DayFirst;
    let mut convention_hits =
        apply_strategy(Strategy::Convention(convention), &texts, &mut instants);
    let unresolved = count_unresolved(&instants);
    if total > 0 && unresolved as f64 / total as f64 > MONTH_FIRST_THRESHOLD {
        let mut month_first = native;
        let hits = apply_strategy(
            Strategy::Convention(Convention::MonthFirst),
            &texts,
            &mut month_first,
        );
        let alt_unresolved = count_unresolved(&month_first);
        if alt_unresolved < unresolved {
            debug!("month-first parsing leaves fewer errors ({alt_unresolved} vs {unresolved})");
            instants = month_first;
            convention = Convention::MonthFirst;
            convention_hits = hits;
        }
    }
    if convention_hits > 0 {
        recovered.push((Strategy::Convention(convention), convention_hits));
    }

    // Steps 3-4: explicit formats, then inference, on the residue only.
    for strategy in EXPLICIT_FORMATS.iter().copied().chain([Strategy::Inferred]) {
        if count_unresolved(&instants) == 0 {
            break;
        }
        let hits = apply_strategy(strategy, &texts, &mut instants);
        if hits > 0 {
            debug!("recovered {hits} timestamps with {strategy}");
            recovered.push((strategy, hits));
        }
    }

    // Step 5: a column nothing could read may hold epoch or serial numbers.
    let mut numeric_unit = None;
    if total > 0 && count_unresolved(&instants) == total {
        if let Some((unit, parsed)) = parse_numeric_column(&cells) {
            numeric_unit = Some(unit);
            instants = parsed;
        }
    }

    let unresolved = count_unresolved(&instants);
    if unresolved > 0 {
        warn!("{unresolved} of {total} timestamps could not be parsed");
    }

    ParsedTimestamps {
        instants,
        unresolved,
        convention,
        recovered,
        numeric_unit,
    }
}

fn parse_numeric_column(
    cells: &[&CellValue],
) -> Option<(NumericUnit, Vec<Option<NaiveDateTime>>)> {
    let numeric = coerce_column(cells.iter().copied());
    let mut finite: Vec<f64> = numeric.iter().copied().filter(|v| v.is_finite()).collect();
    let mid = median(&mut finite)?;

    let unit = if mid > 1e12 {
        NumericUnit::UnixMillis
    } else if mid > 1e9 {
        NumericUnit::UnixSeconds
    } else if mid > 20_000.0 && mid < 60_000.0 {
        NumericUnit::SpreadsheetDays
    } else {
        debug!("numeric timestamp median {mid} matches no known epoch");
        return None;
    };
    debug!("timestamp column read as {unit:?} (median {mid})");

    let instants = numeric
        .iter()
        .map(|&v| if v.is_finite() { from_numeric(v, unit) } else { None })
        .collect();
    Some((unit, instants))
}

fn from_numeric(value: f64, unit: NumericUnit) -> Option<NaiveDateTime> {
    let millis = match unit {
        NumericUnit::UnixMillis => value,
        NumericUnit::UnixSeconds => value * 1_000.0,
        NumericUnit::SpreadsheetDays => {
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
            let offset = Duration::try_milliseconds((value * 86_400_000.0).round() as i64)?;
            return epoch.checked_add_signed(offset);
        }
    };
    DateTime::from_timestamp_millis(millis.round() as i64).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn text_cells(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::Text(v.to_string())).collect()
    }

    fn ymd(dt: Option<NaiveDateTime>) -> (i32, u32, u32) {
        let dt = dt.expect("resolved");
        (dt.year(), dt.month(), dt.day())
    }

    #[test]
    fn mixed_formats_and_invalid_rows() {
        let cells = text_cells(&["22.11.2025 16:20", "2025-11-22 16:30:00", "invalid"]);
        let parsed = parse_timestamps(&cells);

        assert_eq!(ymd(parsed.instants[0]), (2025, 11, 22));
        assert_eq!(parsed.instants[0].unwrap().hour(), 16);
        assert_eq!(parsed.instants[0].unwrap().minute(), 20);
        assert_eq!(ymd(parsed.instants[1]), (2025, 11, 22));
        assert_eq!(parsed.instants[1].unwrap().minute(), 30);
        assert!(parsed.instants[2].is_none());
        assert_eq!(parsed.unresolved, 1);
        assert_eq!(parsed.resolution(), Resolution::Partial { unresolved: 1 });
        assert_eq!(parsed.convention, Convention::DayFirst);
    }

    #[test]
    fn seconds_and_fractions() {
        let cells = text_cells(&["17.11.2025 0:00", "17.11.2025 00:00:05.250"]);
        let parsed = parse_timestamps(&cells);
        assert_eq!(parsed.resolution(), Resolution::Full);
        let second = parsed.instants[1].unwrap();
        assert_eq!(second.second(), 5);
        assert_eq!(second.nanosecond(), 250_000_000);
    }

    #[test]
    fn month_first_chosen_when_it_resolves_more() {
        let cells = text_cells(&["11/22/2025 10:00", "11/23/2025 10:00", "11/24/2025 10:00"]);
        let parsed = parse_timestamps(&cells);
        assert_eq!(parsed.convention, Convention::MonthFirst);
        assert_eq!(ymd(parsed.instants[2]), (2025, 11, 24));
        assert_eq!(parsed.resolution(), Resolution::Full);
    }

    fn convention_column(month_first_only: usize) -> Vec<CellValue> {
        let mut values = vec!["11/22/2025 10:00"; month_first_only];
        values.resize(10, "03/04/2025 10:00");
        text_cells(&values)
    }

    #[test]
    fn month_first_not_tried_at_exactly_thirty_percent() {
        let parsed = parse_timestamps(&convention_column(3));
        assert_eq!(parsed.convention, Convention::DayFirst);
        assert_eq!(parsed.unresolved, 3);
        assert!(parsed.instants[..3].iter().all(Option::is_none));
        assert_eq!(ymd(parsed.instants[9]), (2025, 4, 3));
    }

    #[test]
    fn month_first_tried_above_thirty_percent() {
        let parsed = parse_timestamps(&convention_column(4));
        assert_eq!(parsed.convention, Convention::MonthFirst);
        assert_eq!(parsed.resolution(), Resolution::Full);
        assert_eq!(ymd(parsed.instants[0]), (2025, 11, 22));
        assert_eq!(ymd(parsed.instants[9]), (2025, 3, 4));
        assert_eq!(
            parsed.recovered,
            vec![(Strategy::Convention(Convention::MonthFirst), 10)]
        );
    }

    #[test]
    fn later_strategies_skipped_once_everything_resolves() {
        let cells = text_cells(&["22.11.2025 16:20", "22.11.2025 16:21:30"]);
        let parsed = parse_timestamps(&cells);
        assert_eq!(parsed.resolution(), Resolution::Full);
        assert_eq!(
            parsed.recovered,
            vec![(Strategy::Convention(Convention::DayFirst), 2)]
        );
    }

    #[test]
    fn ambiguous_dates_stay_day_first() {
        let cells = text_cells(&["03.04.2025 10:00"]);
        let parsed = parse_timestamps(&cells);
        assert_eq!(ymd(parsed.instants[0]), (2025, 4, 3));
    }

    #[test]
    fn inferred_formats_recover_residue() {
        let cells = text_cells(&["22.11.2025 16:20", "2025-11-22T16:40:00Z", "22 Nov 2025 16:50"]);
        let parsed = parse_timestamps(&cells);
        assert_eq!(parsed.resolution(), Resolution::Full);
        assert_eq!(parsed.instants[1].unwrap().minute(), 40);
        assert_eq!(parsed.instants[2].unwrap().minute(), 50);
        assert!(parsed
            .recovered
            .iter()
            .any(|(s, n)| *s == Strategy::Inferred && *n >= 1));
    }

    #[test]
    fn resolved_rows_are_never_overwritten() {
        let mut instants = vec![Some(NaiveDateTime::MIN), None];
        let texts = [Some("22.11.2025"), Some("23.11.2025")];
        let hits = apply_strategy(Strategy::DateOnly("%d.%m.%Y"), &texts, &mut instants);
        assert_eq!(hits, 1);
        assert_eq!(instants[0], Some(NaiveDateTime::MIN));
        assert_eq!(ymd(instants[1]), (2025, 11, 23));
    }

    #[test]
    fn unix_seconds_and_millis() {
        let seconds = vec![CellValue::Integer(1_763_828_400), CellValue::Integer(1_763_828_460)];
        let parsed = parse_timestamps(&seconds);
        assert_eq!(parsed.numeric_unit, Some(NumericUnit::UnixSeconds));
        assert_eq!(ymd(parsed.instants[0]), (2025, 11, 22));

        let millis = vec![CellValue::Float(1_763_828_400_000.0)];
        let parsed = parse_timestamps(&millis);
        assert_eq!(parsed.numeric_unit, Some(NumericUnit::UnixMillis));
        assert_eq!(ymd(parsed.instants[0]), (2025, 11, 22));
    }

    #[test]
    fn spreadsheet_serial_days() {
        let cells = vec![CellValue::Float(45983.5), CellValue::Text("45984,25".into())];
        let parsed = parse_timestamps(&cells);
        assert_eq!(parsed.numeric_unit, Some(NumericUnit::SpreadsheetDays));
        let first = parsed.instants[0].unwrap();
        assert_eq!((first.year(), first.month(), first.day()), (2025, 11, 22));
        assert_eq!(first.hour(), 12);
        assert_eq!(parsed.instants[1].unwrap().hour(), 6);
    }

    #[test]
    fn small_numbers_stay_unresolved() {
        let cells = vec![CellValue::Integer(1), CellValue::Integer(2)];
        let parsed = parse_timestamps(&cells);
        assert!(parsed.is_fully_unresolved());
        assert_eq!(parsed.numeric_unit, None);
    }

    #[test]
    fn empty_column_is_unresolved() {
        let parsed = parse_timestamps(&Vec::<CellValue>::new());
        assert!(parsed.is_empty());
        assert!(parsed.is_fully_unresolved());
    }

    #[test]
    fn typed_cells_pass_through() {
        let dt = NaiveDate::from_ymd_opt(2025, 11, 22)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let cells = vec![CellValue::DateTime(dt), CellValue::Text("22.11.2025 09:00".into())];
        let parsed = parse_timestamps(&cells);
        assert_eq!(parsed.instants[0], Some(dt));
        assert_eq!(parsed.resolution(), Resolution::Full);
    }
}
