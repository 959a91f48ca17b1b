//! `stockrecon run|units|config`: reconcile a system stock export against a
//! manual workbook.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use stockrecon::grid::SheetSource;
use stockrecon::model::{ReconInput, ReconOutcome};
use stockrecon::report::{render_match_summary, render_report, render_unit_census, unit_census, RenderOptions};
use stockrecon::{ReconConfig, ReconError};

use crate::exit_codes::{
    EXIT_DISCREPANCIES, EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_NO_MATCHES, EXIT_SOURCE_UNREADABLE,
};
use crate::CliError;

#[derive(Args)]
pub struct SourceArgs {
    /// System export (left side): xlsx, xls, ods or csv
    pub system: PathBuf,

    /// Manual workbook (right side) holding one sheet per category
    pub manual: PathBuf,

    /// Path to a .recon.toml config (built-in defaults when omitted)
    #[arg(long, short = 'c', env = "STOCKRECON_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Output JSON to stdout instead of human summary
    #[arg(long)]
    pub json: bool,

    /// Where to write the text report (default: next to the manual workbook)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write committed match assignments as CSV
    #[arg(long)]
    pub assignments: Option<PathBuf>,

    /// Exit non-zero when any discrepancy is reported
    #[arg(long)]
    pub strict: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Parse and validate a config without running
    #[command(after_help = "\
Examples:
  stockrecon config check month-end.recon.toml")]
    Check {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// Print the built-in default config as TOML
    Default,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn engine_err(e: ReconError) -> CliError {
    let code = match e {
        ReconError::UnknownSheet { .. } | ReconError::Grid { .. } => EXIT_SOURCE_UNREADABLE,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
    };
    recon_err(code, e.to_string())
}

fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        recon_err(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display()))
    })?;
    ReconConfig::from_toml(&text).map_err(|e| {
        recon_err(EXIT_INVALID_CONFIG, format!("{}: {e}", path.display()))
            .with_hint("run `stockrecon config default` for a complete example")
    })
}

fn load_source(path: &Path) -> Result<impl SheetSource, CliError> {
    stockrecon_io::load_document(path).map_err(|e| recon_err(EXIT_SOURCE_UNREADABLE, e))
}

fn load_input(sources: &SourceArgs) -> Result<(ReconConfig, ReconInput), CliError> {
    let config = load_config(sources.config.as_deref())?;
    let system = load_source(&sources.system)?;
    let manual = load_source(&sources.manual)?;
    let input = stockrecon::extract_input(&config, &system, &manual).map_err(engine_err)?;
    Ok((config, input))
}

fn all_records(input: &ReconInput) -> impl Iterator<Item = &stockrecon::NormalizedRecord> {
    input
        .left
        .records
        .iter()
        .chain(input.categories.iter().flat_map(|c| c.records.iter()))
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let (config, input) = load_input(&args.sources)?;

    for line in render_unit_census(&unit_census(all_records(&input))).lines() {
        log::info!("{line}");
    }

    let outcome = stockrecon::run(&config, &input).map_err(engine_err)?;

    if args.json {
        let json = stockrecon_io::json::to_string(&outcome)
            .map_err(|e| recon_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json}");
    }

    let result = match outcome {
        ReconOutcome::Reconciled(result) => result,
        ReconOutcome::NoMatches { left_total, right_total } => {
            return Err(recon_err(
                EXIT_NO_MATCHES,
                format!(
                    "no matching records found ({left_total} {} rows, {right_total} {} rows); nothing written",
                    input.left.label, input.right_label
                ),
            ));
        }
    };

    let report_path = args
        .report
        .clone()
        .unwrap_or_else(|| stockrecon_io::default_report_path(&args.sources.system, &args.sources.manual));
    let generated = chrono::Local::now().naive_local();
    let text = render_report(&result.report, generated, &RenderOptions::from(config.report.clone()));
    stockrecon_io::write_text(&report_path, &text).map_err(|e| recon_err(EXIT_ERROR, e))?;

    if let Some(ref path) = args.assignments {
        stockrecon_io::csv::export_assignments(&result.assignments, path)
            .map_err(|e| recon_err(EXIT_ERROR, e))?;
        eprintln!("wrote {}", path.display());
    }

    // Human summary to stderr
    let report = &result.report;
    eprintln!("Total matches found: {}", report.total_matches);
    for cat in &report.categories {
        eprintln!("  - {} matches: {}", cat.label, cat.matches);
    }
    if !args.json && report.total_matches > 0 {
        eprintln!("\nMatch Summary (first {}):", config.report.summary_limit);
        eprint!(
            "{}",
            render_match_summary(
                &result.assignments,
                config.report.summary_limit,
                config.report.summary_name_chars
            )
        );
    }
    eprintln!(
        "\n{} name mismatches, {} unmatched {}, {} unmatched {}",
        report.name_mismatches().count(),
        report.unmatched_left().count(),
        report.left_label,
        report.unmatched_right().count(),
        report.right_label,
    );
    eprintln!("wrote {}", report_path.display());

    if args.strict && !report.discrepancies.is_empty() {
        return Err(recon_err(
            EXIT_DISCREPANCIES,
            format!("{} discrepancies found (--strict)", report.discrepancies.len()),
        ));
    }

    Ok(())
}

// ============================================================================
// units
// ============================================================================

pub fn cmd_units(sources: SourceArgs, json: bool) -> Result<(), CliError> {
    let (_, input) = load_input(&sources)?;
    let census = unit_census(all_records(&input));

    if json {
        let out = stockrecon_io::json::to_string(&census)
            .map_err(|e| recon_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{out}");
    } else {
        print!("{}", render_unit_census(&census));
    }
    Ok(())
}

// ============================================================================
// config
// ============================================================================

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Check { config } => {
            let config = load_config(Some(&config))?;
            let categories: Vec<String> = config
                .categories
                .iter()
                .map(|c| format!("{} ({})", c.prefix, c.sheet))
                .collect();
            eprintln!(
                "valid: '{}' with {} categor{}: {}",
                config.name,
                categories.len(),
                if categories.len() == 1 { "y" } else { "ies" },
                categories.join(", "),
            );
            Ok(())
        }
        ConfigCommands::Default => {
            let text = ReconConfig::default().to_toml().map_err(engine_err)?;
            print!("{text}");
            Ok(())
        }
    }
}
