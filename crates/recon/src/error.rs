use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (duplicate prefix, bad column, alias conflict, etc.).
    ConfigValidation(String),
    /// A category or source names a sheet the workbook does not contain.
    UnknownSheet { source: String, sheet: String },
    /// The grid reader could not produce cells for a source document.
    Grid { source: String, message: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownSheet { source, sheet } => {
                write!(f, "source '{source}': sheet '{sheet}' not found")
            }
            Self::Grid { source, message } => {
                write!(f, "source '{source}': cannot read grid: {message}")
            }
        }
    }
}

impl std::error::Error for ReconError {}
