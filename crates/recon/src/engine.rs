use crate::classify::classify;
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::extract::extract_records;
use crate::grid::{CellGrid, SheetSource};
use crate::layout::SourceKind;
use crate::matcher::match_category;
use crate::model::{
    CategoryRecords, MatchAssignment, ReconInput, ReconMeta, ReconOutcome, ReconResult, SourceRecords,
};
use crate::report::build_report;

/// Extract the left source and every configured category from the two
/// documents.
///
/// The left sheet must exist when the config names one. A missing category
/// sheet contributes zero records and a warning.
pub fn extract_input(
    config: &ReconConfig,
    left: &dyn SheetSource,
    right: &dyn SheetSource,
) -> Result<ReconInput, ReconError> {
    let rules = config.extract_rules()?;

    let left_grid: &dyn CellGrid = match &config.left.sheet {
        Some(name) => left.sheet(name).ok_or_else(|| ReconError::UnknownSheet {
            source: config.left.label.clone(),
            sheet: name.clone(),
        })?,
        None => left.first_sheet().ok_or_else(|| ReconError::Grid {
            source: config.left.label.clone(),
            message: "document has no sheets".into(),
        })?,
    };
    let left_records = extract_records(left_grid, config.layouts.for_kind(SourceKind::System), &rules);
    log::info!("{}: {} data rows", config.left.label, left_records.len());

    let manual_layout = config.layouts.for_kind(SourceKind::Manual);
    let categories = config
        .categories
        .iter()
        .map(|cat| {
            let records = match right.sheet(&cat.sheet) {
                Some(grid) => extract_records(grid, manual_layout, &rules),
                None => {
                    log::warn!(
                        "{}: sheet '{}' not found; category {} has no records",
                        config.right.label,
                        cat.sheet,
                        cat.prefix
                    );
                    Vec::new()
                }
            };
            log::info!(
                "{} {}: {} data rows",
                config.right.label,
                cat.display_label(),
                records.len()
            );
            CategoryRecords {
                prefix: cat.prefix.clone(),
                label: cat.display_label().to_string(),
                records,
            }
        })
        .collect();

    Ok(ReconInput {
        left: SourceRecords {
            label: config.left.label.clone(),
            records: left_records,
        },
        right_label: config.right.label.clone(),
        categories,
    })
}

/// Match every category against the left source, classify what is left over
/// and build the report.
///
/// Zero committed matches across all categories yields
/// [`ReconOutcome::NoMatches`]; the caller should not write a report or
/// assignments in that case.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconOutcome, ReconError> {
    let mut seen = std::collections::HashSet::new();
    for cat in &input.categories {
        if !seen.insert(cat.prefix.as_str()) {
            return Err(ReconError::ConfigValidation(format!(
                "duplicate category prefix '{}' in input",
                cat.prefix
            )));
        }
    }

    let assignments: Vec<MatchAssignment> = input
        .categories
        .iter()
        .map(|cat| match_category(&input.left.records, &cat.records, &cat.prefix))
        .collect();

    let total: usize = assignments.iter().map(MatchAssignment::len).sum();
    if total == 0 {
        log::warn!("no matches found");
        return Ok(ReconOutcome::NoMatches {
            left_total: input.left.records.len(),
            right_total: input.right_total(),
        });
    }

    let discrepancies = classify(&input.left.records, &input.categories, &assignments);
    let report = build_report(input, &assignments, discrepancies);
    log::info!(
        "{} matches, {} name mismatches, {} unmatched {}, {} unmatched {}",
        report.total_matches,
        report.name_mismatches().count(),
        report.unmatched_left().count(),
        report.left_label,
        report.unmatched_right().count(),
        report.right_label
    );

    Ok(ReconOutcome::Reconciled(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        assignments,
        report,
    }))
}
