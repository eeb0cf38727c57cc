use analyzer_compare::analysis::coerce::coerce_str;
use analyzer_compare::analysis::compare::pearson;
use analyzer_compare::analysis::outliers::suppress_sentinels;
use analyzer_compare::analysis::stats::describe;
use proptest::prelude::*;

/// Readings with plenty of exact 0/1 dropouts and missing values mixed in.
fn readings() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        prop_oneof![
            3 => -50.0f64..50.0,
            1 => Just(0.0),
            1 => Just(1.0),
            1 => Just(f64::NAN),
        ],
        0..64,
    )
}

fn same(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
}

proptest! {
    #[test]
    fn suppression_is_idempotent(values in readings()) {
        let once = suppress_sentinels(&values);
        let twice = suppress_sentinels(&once);
        prop_assert!(same(&once, &twice));
        prop_assert_eq!(once.len(), values.len());
    }

    #[test]
    fn suppression_only_touches_sentinels(values in readings()) {
        let out = suppress_sentinels(&values);
        for (before, after) in values.iter().zip(&out) {
            if *before != 0.0 && *before != 1.0 {
                prop_assert!(before == after || (before.is_nan() && after.is_nan()));
            }
        }
    }

    #[test]
    fn blank_text_is_missing(raw in "[ \t]{0,8}") {
        prop_assert!(coerce_str(&raw).is_nan());
    }

    #[test]
    fn comma_decimals_match_dot_decimals(int in -99_999i64..99_999, frac in 0u32..1000) {
        let dot = format!("{int}.{frac:03}");
        let comma = format!("{int},{frac:03}");
        prop_assert_eq!(coerce_str(&comma), dot.parse::<f64>().unwrap());
    }

    #[test]
    fn alphabetic_text_never_parses(raw in "[a-mo-zA-HJ-MO-Z]{1,12}") {
        prop_assert!(coerce_str(&raw).is_nan());
    }

    #[test]
    fn statistics_are_bounded(values in readings()) {
        match describe("A", &values) {
            Some(s) => {
                prop_assert!(s.count >= 1);
                prop_assert!(s.min <= s.median && s.median <= s.max);
                prop_assert!(s.min <= s.mean + 1e-9 && s.mean <= s.max + 1e-9);
                prop_assert!(s.std >= 0.0);
            }
            None => prop_assert!(values.iter().all(|v| !v.is_finite())),
        }
    }

    #[test]
    fn correlation_is_within_unit_interval(a in readings(), b in readings()) {
        if let Some(r) = pearson(&a, &b).value() {
            prop_assert!((-1.0..=1.0).contains(&r));
        }
    }
}
