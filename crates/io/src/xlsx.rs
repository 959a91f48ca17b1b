// Excel import (xlsx, xlsm, xls, xlsb, ods)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use stockrecon::model::CellValue;
use stockrecon::{MemoryGrid, MemoryWorkbook};

/// Maximum dimensions read from one sheet
const MAX_ROWS: usize = 65536;
const MAX_COLS: usize = 256;

/// Cached values only: formulas are read as their last computed result.
pub fn import(path: &Path) -> Result<MemoryWorkbook, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let mut book = MemoryWorkbook::new();
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

        let (height, width) = range.get_size();
        if height > MAX_ROWS || width > MAX_COLS {
            log::warn!(
                "sheet '{}' truncated from {}x{} to {}x{}",
                sheet_name,
                height,
                width,
                height.min(MAX_ROWS),
                width.min(MAX_COLS)
            );
        }

        // Range start offset (data may not begin at A1)
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut grid = MemoryGrid::new();
        for (row_idx, row) in range.rows().enumerate() {
            let target_row = start_row as usize + row_idx + 1;
            if target_row > MAX_ROWS {
                break;
            }
            for (col_idx, cell) in row.iter().enumerate() {
                let target_col = start_col as usize + col_idx + 1;
                if target_col > MAX_COLS {
                    break;
                }
                let value = convert(cell);
                if !value.is_empty() {
                    grid.set(target_row, target_col, value);
                }
            }
        }
        log::debug!("{}: sheet '{}' {}x{}", path.display(), sheet_name, height, width);
        book.add_sheet(sheet_name.clone(), grid);
    }
    Ok(book)
}

fn convert(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        // Date serials compare as numbers
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use stockrecon::SheetSource;
    use tempfile::tempdir;

    #[test]
    fn test_import_named_sheets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manual.xlsx");

        let mut workbook = Workbook::new();
        let rm = workbook.add_worksheet();
        rm.set_name("RM").unwrap();
        rm.write_string(4, 0, "SL\nNo").unwrap();
        rm.write_number(5, 0, 1.0).unwrap();
        rm.write_string(5, 1, "x 1").unwrap();
        rm.write_number(5, 5, 12.5).unwrap();
        rm.write_boolean(5, 6, true).unwrap();
        let con = workbook.add_worksheet();
        con.set_name("Consumable").unwrap();
        con.write_string(2, 3, "Gloves").unwrap();
        workbook.save(&path).unwrap();

        let book = import(&path).unwrap();
        assert_eq!(book.sheet_names(), vec!["RM", "Consumable"]);

        let rm = book.sheet("RM").unwrap();
        assert_eq!(rm.cell(5, 1), CellValue::Text("SL\nNo".into()));
        assert_eq!(rm.cell(6, 1), CellValue::Number(1.0));
        assert_eq!(rm.cell(6, 2), CellValue::Text("x 1".into()));
        assert_eq!(rm.cell(6, 6), CellValue::Number(12.5));
        assert_eq!(rm.cell(6, 7), CellValue::Bool(true));
        assert_eq!(rm.cell(6, 3), CellValue::Empty);

        // Data starting away from A1 keeps its absolute position
        let con = book.sheet("Consumable").unwrap();
        assert_eq!(con.cell(3, 4), CellValue::Text("Gloves".into()));
        assert_eq!(con.max_row(), 3);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let err = import(&dir.path().join("absent.xlsx")).unwrap_err();
        assert!(err.starts_with("Failed to open Excel file"));
    }

    #[test]
    fn test_convert_scalars() {
        assert_eq!(convert(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(convert(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(convert(&Data::DateTimeIso("2025-08-31".into())), CellValue::Text("2025-08-31".into()));
    }
}
