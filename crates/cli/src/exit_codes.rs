//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error (unspecified)                              |
//! | 2    | CLI usage error (bad args)                               |
//! | 3    | No record matched across any category                    |
//! | 4    | Discrepancies found and `--strict` was given             |
//! | 5    | Config file failed to parse or validate                  |
//! | 6    | A source document could not be read                      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure (e.g. cannot write an output file).
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// The run committed zero matches. Nothing was written.
pub const EXIT_NO_MATCHES: u8 = 3;

/// `--strict` and the report lists at least one discrepancy.
pub const EXIT_DISCREPANCIES: u8 = 4;

/// Config parse or validation error.
pub const EXIT_INVALID_CONFIG: u8 = 5;

/// A source document is missing, unreadable or lacks a required sheet.
pub const EXIT_SOURCE_UNREADABLE: u8 = 6;
