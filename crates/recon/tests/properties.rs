// Property-based tests for extraction and matching.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use stockrecon::extract::{extract_records, ExtractRules};
use stockrecon::layout::{LayoutDescriptor, SourceKind};
use stockrecon::matcher::{match_category, MatchPredicate};
use stockrecon::model::{Amount, CellValue, NormalizedRecord};
use stockrecon::normalize::{normalize_code_str, parse_amount};
use stockrecon::MemoryGrid;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Small vocabularies so collisions (and therefore matches) are common.
fn arb_record() -> impl Strategy<Value = NormalizedRecord> {
    (
        prop::sample::select(vec!["", "A1", "B2", "C3"]),
        prop::sample::select(vec!["", "Bolt", "Nut", "Washer"]),
        prop::sample::select(vec!["", "PCS", "KG"]),
        0i64..3,
    )
        .prop_map(|(code, name, unit, fig)| {
            let a = Amount::from_hundredths(fig * 50);
            NormalizedRecord {
                source_row: 0,
                product_code: code.to_string(),
                item_name: name.to_string(),
                unit: unit.to_string(),
                unit_label: unit.to_string(),
                opening_qty: a,
                opening_value: a,
                receive_qty: a,
                receive_value: a,
                issue_qty: a,
                issue_value: a,
                closing_qty: a,
                closing_value: a,
            }
        })
}

fn arb_side() -> impl Strategy<Value = Vec<NormalizedRecord>> {
    proptest::collection::vec(arb_record(), 0..24).prop_map(|mut records| {
        for (i, r) in records.iter_mut().enumerate() {
            r.source_row = 6 + i;
        }
        records
    })
}

fn arb_cell() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        2 => Just(CellValue::Empty),
        2 => (0u16..40).prop_map(|n| CellValue::Number(f64::from(n))),
        2 => r"[0-9]{1,3}".prop_map(CellValue::Text),
        1 => prop::sample::select(vec!["SL No", "SL", "Match ID", "Total"])
            .prop_map(|s| CellValue::Text(s.to_string())),
        2 => r"[A-Za-z ]{0,8}".prop_map(CellValue::Text),
    ]
}

fn arb_grid() -> impl Strategy<Value = MemoryGrid> {
    proptest::collection::vec(proptest::collection::vec(arb_cell(), 0..14), 0..30)
        .prop_map(MemoryGrid::from_rows)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config())]

    #[test]
    fn matching_is_deterministic(left in arb_side(), right in arb_side()) {
        let a = match_category(&left, &right, "RM");
        let b = match_category(&left, &right, "RM");
        prop_assert_eq!(a, b);
    }

    #[test]
    fn each_left_row_matched_at_most_once(left in arb_side(), right in arb_side()) {
        let out = match_category(&left, &right, "RM");
        let mut seen = HashSet::new();
        for e in &out.entries {
            prop_assert!(seen.insert(e.left_row));
        }
    }

    #[test]
    fn ids_are_sequential_in_left_order(left in arb_side(), right in arb_side()) {
        let out = match_category(&left, &right, "CON");
        for (i, e) in out.entries.iter().enumerate() {
            prop_assert_eq!(&e.match_id, &format!("CON{:04}", i + 1));
        }
        prop_assert!(out.entries.windows(2).all(|w| w[0].left_row < w[1].left_row));
    }

    #[test]
    fn binds_to_first_satisfying_right_record(left in arb_side(), right in arb_side()) {
        let out = match_category(&left, &right, "RM");
        let mut entries = out.entries.iter().peekable();
        for l in &left {
            let expected = right
                .iter()
                .find(|r| MatchPredicate::FullCriteria.matches(l, r))
                .map(|r| r.source_row);
            let actual = match entries.peek() {
                Some(e) if e.left_row == l.source_row => entries.next().map(|e| e.right_row),
                _ => None,
            };
            prop_assert_eq!(actual, expected);
        }
    }

    #[test]
    fn extraction_is_idempotent(grid in arb_grid(), paged in any::<bool>()) {
        let kind = if paged { SourceKind::System } else { SourceKind::Manual };
        let layout = LayoutDescriptor::for_kind(kind);
        let rules = ExtractRules::default();
        let first = extract_records(&grid, &layout, &rules);
        let second = extract_records(&grid, &layout, &rules);
        prop_assert!(first.windows(2).all(|w| w[0].source_row < w[1].source_row));
        prop_assert!(first.iter().all(|r| !r.product_code.is_empty() || !r.item_name.is_empty()));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn code_normalization_is_stable(raw in r"[ a-zA-Z0-9\t-]{0,12}") {
        let once = normalize_code_str(&raw);
        prop_assert_eq!(normalize_code_str(&once), once.clone());
        prop_assert!(!once.chars().any(char::is_whitespace));
    }

    #[test]
    fn parenthesised_amounts_are_negative(units in 0i64..1_000_000, cents in 0i64..100) {
        let text = format!("({},{:03}.{:02})", units / 1000, units % 1000, cents);
        let parsed = parse_amount(&text);
        let expected = -Amount::from_hundredths((units / 1000 * 1000 + units % 1000) * 100 + cents);
        prop_assert_eq!(parsed, Some(expected));
    }
}
