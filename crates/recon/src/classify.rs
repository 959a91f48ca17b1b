use std::collections::HashSet;

use crate::matcher::{field_differences, names_match, MatchPredicate};
use crate::model::{CategoryRecords, Discrepancy, MatchAssignment, NormalizedRecord};

/// (normalized code, item name) pairs that were committed in any pass.
fn matched_identities(assignments: &[MatchAssignment]) -> HashSet<(&str, &str)> {
    assignments
        .iter()
        .flat_map(|a| a.entries.iter())
        .map(|e| (e.product_code.as_str(), e.item_name.as_str()))
        .collect()
}

fn is_matched(identities: &HashSet<(&str, &str)>, record: &NormalizedRecord) -> bool {
    identities.contains(&(record.product_code.as_str(), record.item_name.as_str()))
}

/// Classify every record left out of the committed assignments.
///
/// A record counts as matched when any pass committed a pair with the same
/// normalized code and item name, so duplicates of a matched line are not
/// reported.
///
/// Unmatched left records are checked against the right side (categories in
/// order, rows in order) under the name-only predicate. The first name match
/// yields a [`Discrepancy::NameMatchedValueMismatch`] listing every differing
/// field; no name match yields [`Discrepancy::UnmatchedLeft`]. Unmatched right
/// records whose name appears nowhere on the left become
/// [`Discrepancy::UnmatchedRight`].
pub fn classify(
    left: &[NormalizedRecord],
    categories: &[CategoryRecords],
    assignments: &[MatchAssignment],
) -> Vec<Discrepancy> {
    let identities = matched_identities(assignments);
    let mut results = Vec::new();

    for l in left {
        if is_matched(&identities, l) {
            continue;
        }

        let name_match = categories.iter().find_map(|cat| {
            cat.records
                .iter()
                .find(|r| MatchPredicate::NameOnly.matches(l, r))
                .map(|r| (cat, r))
        });

        match name_match {
            Some((cat, r)) => {
                let differences = field_differences(l, r);
                if differences.is_empty() {
                    continue;
                }
                results.push(Discrepancy::NameMatchedValueMismatch {
                    category: cat.prefix.clone(),
                    left: l.clone(),
                    right: r.clone(),
                    differences,
                });
            }
            None => results.push(Discrepancy::UnmatchedLeft { record: l.clone() }),
        }
    }

    for cat in categories {
        for r in &cat.records {
            if is_matched(&identities, r) {
                continue;
            }
            if !left.iter().any(|l| names_match(l, r)) {
                results.push(Discrepancy::UnmatchedRight {
                    category: cat.prefix.clone(),
                    record: r.clone(),
                });
            }
        }
    }

    results
}
