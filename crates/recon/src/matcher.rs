use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Field, FieldDifference, MatchAssignment, MatchEntry, NormalizedRecord};

/// Number of near misses logged per pass at debug level.
const NEAR_MISS_LOG_LIMIT: usize = 3;

// ---------------------------------------------------------------------------
// Field equality
// ---------------------------------------------------------------------------

pub fn codes_match(left: &NormalizedRecord, right: &NormalizedRecord) -> bool {
    !left.product_code.is_empty() && left.product_code == right.product_code
}

/// Case-sensitive; blank names never match.
pub fn names_match(left: &NormalizedRecord, right: &NormalizedRecord) -> bool {
    !left.item_name.is_empty() && left.item_name == right.item_name
}

pub fn units_match(left: &NormalizedRecord, right: &NormalizedRecord) -> bool {
    !left.unit.is_empty() && left.unit == right.unit
}

/// All eight figures equal to the hundredth. No tolerance.
pub fn figures_match(left: &NormalizedRecord, right: &NormalizedRecord) -> bool {
    Field::FIGURES
        .iter()
        .all(|&f| left.figure(f) == right.figure(f))
}

/// Every field on which `left` and `right` disagree under the matching
/// equality, in report order (code, unit, then the eight figures).
///
/// Blank codes or units count as a difference even when both sides are blank,
/// because a blank value can never satisfy the full predicate. Units compare
/// canonically but are reported as written in each source.
pub fn field_differences(left: &NormalizedRecord, right: &NormalizedRecord) -> Vec<FieldDifference> {
    let mut diffs = Vec::new();
    if !codes_match(left, right) {
        diffs.push(FieldDifference {
            field: Field::ProductCode,
            left: left.product_code.clone(),
            right: right.product_code.clone(),
        });
    }
    if !units_match(left, right) {
        diffs.push(FieldDifference {
            field: Field::Unit,
            left: left.unit_label.clone(),
            right: right.unit_label.clone(),
        });
    }
    for field in Field::FIGURES {
        if let (Some(l), Some(r)) = (left.figure(field), right.figure(field)) {
            if l != r {
                diffs.push(FieldDifference {
                    field,
                    left: l.to_string(),
                    right: r.to_string(),
                });
            }
        }
    }
    diffs
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPredicate {
    /// Code, name, unit and all eight figures. Commits matches.
    FullCriteria,
    /// Item name only. Used to classify discrepancies, never to commit.
    NameOnly,
}

impl MatchPredicate {
    pub fn matches(&self, left: &NormalizedRecord, right: &NormalizedRecord) -> bool {
        match self {
            Self::FullCriteria => {
                codes_match(left, right)
                    && names_match(left, right)
                    && units_match(left, right)
                    && figures_match(left, right)
            }
            Self::NameOnly => names_match(left, right),
        }
    }

    /// The field every satisfying pair must share exactly. Used to bucket
    /// right-side candidates.
    fn key<'r>(&self, record: &'r NormalizedRecord) -> &'r str {
        match self {
            Self::FullCriteria => &record.product_code,
            Self::NameOnly => &record.item_name,
        }
    }
}

// ---------------------------------------------------------------------------
// Match ids
// ---------------------------------------------------------------------------

/// Issues `PREFIX0001`, `PREFIX0002`, … for one category.
///
/// Owned by the caller and passed into each pass, so ids never depend on
/// state outside the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCounter {
    prefix: String,
    issued: u32,
}

impl MatchCounter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            issued: 0,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn issued(&self) -> u32 {
        self.issued
    }

    pub fn next_id(&mut self) -> String {
        self.issued += 1;
        format!("{}{:04}", self.prefix, self.issued)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Index of the first right record satisfying `predicate`, in right-side order.
pub fn first_match(
    left: &NormalizedRecord,
    right: &[NormalizedRecord],
    predicate: MatchPredicate,
) -> Option<usize> {
    right.iter().position(|r| predicate.matches(left, r))
}

/// Commit first-match-wins pairs between `left` and `right`.
///
/// Left records are taken in order; each binds to the first right record,
/// in right-side order, that satisfies `predicate`, and scanning stops there.
/// A right record may be bound by several left records. Ids come from
/// `counter` in left-side order.
///
/// Right records are bucketed by the predicate's key field. Buckets keep
/// right-side order, so the chosen candidate is the one a full scan would
/// choose.
pub fn match_records(
    left: &[NormalizedRecord],
    right: &[NormalizedRecord],
    predicate: MatchPredicate,
    counter: &mut MatchCounter,
) -> MatchAssignment {
    let mut buckets: HashMap<&str, Vec<&NormalizedRecord>> = HashMap::new();
    for record in right {
        let key = predicate.key(record);
        if !key.is_empty() {
            buckets.entry(key).or_default().push(record);
        }
    }

    let mut entries = Vec::new();
    let mut near_misses = 0usize;

    for l in left {
        let Some(candidates) = buckets.get(predicate.key(l)) else {
            continue;
        };
        match candidates.iter().find(|r| predicate.matches(l, r)) {
            Some(r) => entries.push(MatchEntry {
                match_id: counter.next_id(),
                left_row: l.source_row,
                right_row: r.source_row,
                product_code: l.product_code.clone(),
                item_name: l.item_name.clone(),
            }),
            None => {
                if near_misses < NEAR_MISS_LOG_LIMIT {
                    if let Some(r) = candidates.iter().find(|r| names_match(l, r)) {
                        let diffs: Vec<String> = field_differences(l, r)
                            .iter()
                            .take(3)
                            .map(ToString::to_string)
                            .collect();
                        log::debug!(
                            "[{}] near miss left row {} / right row {}: {}",
                            counter.prefix(),
                            l.source_row,
                            r.source_row,
                            diffs.join(", ")
                        );
                        near_misses += 1;
                    }
                }
            }
        }
    }

    log::info!(
        "[{}] {} of {} left records matched against {} right records",
        counter.prefix(),
        entries.len(),
        left.len(),
        right.len()
    );

    MatchAssignment {
        prefix: counter.prefix().to_string(),
        entries,
    }
}

/// Run one category pass with a fresh counter under the full predicate.
pub fn match_category(
    left: &[NormalizedRecord],
    right: &[NormalizedRecord],
    prefix: &str,
) -> MatchAssignment {
    let mut counter = MatchCounter::new(prefix);
    match_records(left, right, MatchPredicate::FullCriteria, &mut counter)
}
