//! Report assembly and text rendering.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::config::ReportConfig;
use crate::model::{
    CategorySummary, DifferenceBreakdown, Discrepancy, DiscrepancyKind, Field, MatchAssignment,
    NormalizedRecord, ReconInput, Report,
};

const RULE_WIDTH: usize = 80;

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Assemble the structured report: totals, per-category counts, the
/// difference breakdown and the classified discrepancies.
pub fn build_report(
    input: &ReconInput,
    assignments: &[MatchAssignment],
    discrepancies: Vec<Discrepancy>,
) -> Report {
    let categories = input
        .categories
        .iter()
        .map(|cat| {
            let count_kind = |kind: DiscrepancyKind| {
                discrepancies
                    .iter()
                    .filter(|d| d.kind() == kind && d.category() == Some(cat.prefix.as_str()))
                    .count()
            };
            CategorySummary {
                prefix: cat.prefix.clone(),
                label: cat.label.clone(),
                right_total: cat.records.len(),
                matches: assignments
                    .iter()
                    .filter(|a| a.prefix == cat.prefix)
                    .map(MatchAssignment::len)
                    .sum(),
                name_mismatches: count_kind(DiscrepancyKind::NameMatchedValueMismatch),
                unmatched_right: count_kind(DiscrepancyKind::UnmatchedRight),
            }
        })
        .collect();

    Report {
        left_label: input.left.label.clone(),
        right_label: input.right_label.clone(),
        left_total: input.left.records.len(),
        right_total: input.right_total(),
        total_matches: assignments.iter().map(MatchAssignment::len).sum(),
        categories,
        breakdown: difference_breakdown(&discrepancies),
        discrepancies,
    }
}

/// Count mismatches per field group. One mismatch may land in several groups.
pub fn difference_breakdown(discrepancies: &[Discrepancy]) -> DifferenceBreakdown {
    let mut breakdown = DifferenceBreakdown::default();
    for d in discrepancies {
        let Discrepancy::NameMatchedValueMismatch { differences, .. } = d else {
            continue;
        };
        if differences.iter().any(|f| f.field == Field::ProductCode) {
            breakdown.product_code += 1;
        }
        if differences.iter().any(|f| f.field == Field::Unit) {
            breakdown.unit += 1;
        }
        if differences.iter().any(|f| f.field.is_figure()) {
            breakdown.quantity_value += 1;
        }
    }
    breakdown
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Entries listed per unmatched section.
    pub preview_limit: usize,
    /// Item-name characters shown in unmatched sections.
    pub name_preview_chars: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        ReportConfig::default().into()
    }
}

impl From<ReportConfig> for RenderOptions {
    fn from(config: ReportConfig) -> Self {
        Self {
            preview_limit: config.preview_limit,
            name_preview_chars: config.name_preview_chars,
        }
    }
}

/// `name` cut to `max` characters, with `...` appended when cut.
fn preview(name: &str, max: usize) -> String {
    if name.chars().count() > max {
        let cut: String = name.chars().take(max).collect();
        format!("{cut}...")
    } else {
        name.to_string()
    }
}

fn rule(out: &mut String, ch: char) {
    out.push_str(&ch.to_string().repeat(RULE_WIDTH));
    out.push('\n');
}

fn section(out: &mut String, title: &str) {
    rule(out, '=');
    out.push_str(title);
    out.push('\n');
    rule(out, '=');
    out.push('\n');
}

fn record_line(r: &NormalizedRecord) -> String {
    format!(
        "Code='{}', Unit='{}', Opening={}/{}, Closing={}/{}",
        r.product_code, r.unit_label, r.opening_qty, r.opening_value, r.closing_qty, r.closing_value
    )
}

/// Render the report as plain text.
pub fn render_report(report: &Report, generated_at: NaiveDateTime, options: &RenderOptions) -> String {
    let left = &report.left_label;
    let right = &report.right_label;
    let mut out = String::new();

    out.push_str("MATCH ANALYSIS REPORT\n");
    rule(&mut out, '=');
    let _ = writeln!(out, "Generated: {}\n", generated_at.format("%Y-%m-%d %H:%M:%S"));

    out.push_str("SUMMARY\n");
    rule(&mut out, '-');
    let _ = writeln!(out, "Total {left} records: {}", report.left_total);
    let _ = writeln!(out, "Total {right} records: {}", report.right_total);
    let _ = writeln!(out, "Full matches (all criteria): {}", report.total_matches);
    for cat in &report.categories {
        let _ = writeln!(out, "  - {} matches: {}", cat.label, cat.matches);
    }
    let _ = writeln!(
        out,
        "Name matches but other differences: {}",
        report.count(DiscrepancyKind::NameMatchedValueMismatch)
    );
    let _ = writeln!(
        out,
        "Unmatched {left} records (no name match): {}",
        report.count(DiscrepancyKind::UnmatchedLeft)
    );
    let _ = writeln!(
        out,
        "Unmatched {right} records (no name match): {}",
        report.count(DiscrepancyKind::UnmatchedRight)
    );
    for cat in &report.categories {
        let _ = writeln!(out, "  - {} unmatched: {}", cat.label, cat.unmatched_right);
    }
    out.push('\n');

    section(&mut out, "RECORDS WITH MATCHING NAMES BUT DIFFERENT VALUES");
    let _ = writeln!(out, "Product Code differences: {}", report.breakdown.product_code);
    let _ = writeln!(out, "Unit differences: {}", report.breakdown.unit);
    let _ = writeln!(out, "Quantity/Value differences: {}\n", report.breakdown.quantity_value);

    for (i, d) in report.name_mismatches().enumerate() {
        let Discrepancy::NameMatchedValueMismatch {
            left: l,
            right: r,
            differences,
            ..
        } = d
        else {
            continue;
        };
        let diffs: Vec<String> = differences.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "{}. Item Name: '{}'", i + 1, l.item_name);
        let _ = writeln!(out, "   {left} (Row {}): {}", l.source_row, record_line(l));
        let _ = writeln!(out, "   {right} (Row {}): {}", r.source_row, record_line(r));
        let _ = writeln!(out, "   Differences: {}\n", diffs.join(", "));
    }

    let unmatched_left: Vec<&NormalizedRecord> = report
        .unmatched_left()
        .filter_map(|d| match d {
            Discrepancy::UnmatchedLeft { record } => Some(record),
            _ => None,
        })
        .collect();
    let unmatched_right: Vec<&NormalizedRecord> = report
        .unmatched_right()
        .filter_map(|d| match d {
            Discrepancy::UnmatchedRight { record, .. } => Some(record),
            _ => None,
        })
        .collect();

    render_unmatched(&mut out, left, right, &unmatched_left, options);
    render_unmatched(&mut out, right, left, &unmatched_right, options);
    out
}

fn render_unmatched(
    out: &mut String,
    side: &str,
    other: &str,
    records: &[&NormalizedRecord],
    options: &RenderOptions,
) {
    out.push('\n');
    section(
        out,
        &format!(
            "UNMATCHED {} RECORDS (No matching name in {other})",
            side.to_uppercase()
        ),
    );
    for (i, r) in records.iter().take(options.preview_limit).enumerate() {
        let _ = writeln!(
            out,
            "{}. Row {}: Code='{}', Name='{}', Unit='{}', Opening={}/{}",
            i + 1,
            r.source_row,
            r.product_code,
            preview(&r.item_name, options.name_preview_chars),
            r.unit_label,
            r.opening_qty,
            r.opening_value
        );
    }
    if records.len() > options.preview_limit {
        let _ = writeln!(
            out,
            "\n...and {} more unmatched {side} records",
            records.len() - options.preview_limit
        );
    }
}

/// First `limit` assignments as `ID: Code='…', Name='…'` lines, across all
/// categories in pass order.
pub fn render_match_summary(assignments: &[MatchAssignment], limit: usize, name_chars: usize) -> String {
    let total: usize = assignments.iter().map(MatchAssignment::len).sum();
    let mut out = String::new();
    for entry in assignments.iter().flat_map(|a| a.entries.iter()).take(limit) {
        let _ = writeln!(
            out,
            "  {}: Code='{}', Name='{}'",
            entry.match_id,
            entry.product_code,
            preview(&entry.item_name, name_chars)
        );
    }
    if total > limit {
        let _ = writeln!(out, "  ... and {} more matches", total - limit);
    }
    out
}

// ---------------------------------------------------------------------------
// Unit census
// ---------------------------------------------------------------------------

/// Canonical unit → raw spellings seen, both sorted. Records with a blank
/// unit are skipped.
pub fn unit_census<'a>(
    records: impl IntoIterator<Item = &'a NormalizedRecord>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut census: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for r in records {
        if r.unit_label.is_empty() {
            continue;
        }
        census
            .entry(r.unit.clone())
            .or_default()
            .insert(r.unit_label.clone());
    }
    census
}

/// One line per canonical unit. Spellings are listed only when the unit was
/// actually rewritten.
pub fn render_unit_census(census: &BTreeMap<String, BTreeSet<String>>) -> String {
    if census.is_empty() {
        return "No units found in data.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "Found {} unique normalized units:", census.len());
    for (canonical, spellings) in census {
        let untouched = spellings.len() == 1
            && spellings.iter().all(|s| s.to_uppercase() == *canonical);
        if untouched {
            let _ = writeln!(out, "  '{canonical}'");
        } else {
            let joined: Vec<String> = spellings.iter().map(|s| format!("'{s}'")).collect();
            let _ = writeln!(out, "  '{canonical}' <- [{}]", joined.join(", "));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
