// File I/O for source documents and run artifacts

pub mod csv;
pub mod json;
pub mod xlsx;

use std::path::{Path, PathBuf};

use stockrecon::MemoryWorkbook;

pub const DEFAULT_REPORT_NAME: &str = "match_analysis_report.txt";

/// Load a source document, choosing the reader by extension.
pub fn load_document(path: &Path) -> Result<MemoryWorkbook, String> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => xlsx::import(path),
        "csv" | "tsv" | "txt" => csv::import(path),
        "" => Err(format!("{}: missing file extension", path.display())),
        other => Err(format!("{}: unsupported file type '.{other}'", path.display())),
    }
}

/// `match_analysis_report.txt` next to the right-side document, or next to
/// the left-side document when the right path has no directory.
pub fn default_report_path(left: &Path, right: &Path) -> PathBuf {
    let parent = |p: &Path| p.parent().filter(|d| !d.as_os_str().is_empty()).map(Path::to_path_buf);
    let dir = parent(right)
        .or_else(|| parent(left))
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(DEFAULT_REPORT_NAME)
}

pub fn write_text(path: &Path, text: &str) -> Result<(), String> {
    std::fs::write(path, text).map_err(|e| format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_path_prefers_right_dir() {
        assert_eq!(
            default_report_path(Path::new("/a/odoo.xlsx"), Path::new("/b/manual.xlsx")),
            PathBuf::from("/b/match_analysis_report.txt")
        );
        assert_eq!(
            default_report_path(Path::new("/a/odoo.xlsx"), Path::new("manual.xlsx")),
            PathBuf::from("/a/match_analysis_report.txt")
        );
        assert_eq!(
            default_report_path(Path::new("odoo.xlsx"), Path::new("manual.xlsx")),
            PathBuf::from("./match_analysis_report.txt")
        );
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_document(Path::new("stock.pdf")).unwrap_err();
        assert!(err.contains("unsupported file type '.pdf'"));
        assert!(load_document(Path::new("stock")).is_err());
    }
}
