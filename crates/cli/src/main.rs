// stockrecon CLI - reconcile a system stock export against a manual workbook

mod exit_codes;
mod recon;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use recon::{ConfigCommands, RunArgs, SourceArgs};

#[derive(Parser)]
#[command(name = "stockrecon")]
#[command(about = "Reconcile an inventory system export against a manual stock workbook")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match every category, write the analysis report
    #[command(after_help = "\
Examples:
  stockrecon run odoo.xlsx manual.xlsx
  stockrecon run odoo.xlsx manual.xlsx --config month-end.recon.toml
  stockrecon run odoo.xlsx manual.xlsx --assignments matches.csv --strict
  stockrecon run odoo.xlsx manual.xlsx --json > outcome.json")]
    Run(RunArgs),

    /// List every unit spelling found and the token it normalizes to
    Units {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Inspect or validate configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  stockrecon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  stockrecon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // `log` records from the library crates are bridged into this subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            };
        }
    };
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => recon::cmd_run(args),
        Commands::Units { sources, json } => recon::cmd_units(sources, json),
        Commands::Config(cmd) => recon::cmd_config(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_sources_and_flags() {
        let cli = Cli::try_parse_from([
            "stockrecon", "-vv", "run", "odoo.xlsx", "manual.xlsx", "--strict", "--assignments", "m.csv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.strict);
                assert!(!args.json);
                assert_eq!(args.sources.system.to_str(), Some("odoo.xlsx"));
                assert_eq!(args.assignments.as_deref().and_then(|p| p.to_str()), Some("m.csv"));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_requires_both_sources() {
        assert!(Cli::try_parse_from(["stockrecon", "run", "odoo.xlsx"]).is_err());
    }
}
