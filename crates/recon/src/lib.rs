//! `stockrecon`: inventory ledger reconciliation engine.
//!
//! Pure engine crate: reads cells through [`grid::CellGrid`], normalizes
//! rows into records, matches a system export against a manual workbook and
//! classifies what is left over. No CLI or file-format dependencies.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod grid;
pub mod layout;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;

pub use config::ReconConfig;
pub use engine::{extract_input, run};
pub use error::ReconError;
pub use grid::{CellGrid, MemoryGrid, MemoryWorkbook, SheetSource};
pub use model::{NormalizedRecord, ReconInput, ReconOutcome, ReconResult, Report};
