//! Record extraction: locate header/data blocks in a grid and turn each data
//! row into a [`NormalizedRecord`].

use serde::Serialize;

use crate::grid::CellGrid;
use crate::layout::{detect_layout, LayoutDescriptor};
use crate::model::{CellValue, NormalizedRecord};
use crate::normalize::{normalize_numeric, normalize_product_code, normalize_text, UnitAliases};

pub const DEFAULT_MATCH_ID_HEADER: &str = "Match ID";
pub const DEFAULT_HEADER_MARKERS: [&str; 3] = ["SL\nNo", "SL No", "SL"];

/// Literals and tables the extractor consults while scanning.
#[derive(Debug, Clone)]
pub struct ExtractRules {
    pub match_id_header: String,
    pub header_markers: Vec<String>,
    pub units: UnitAliases,
}

impl Default for ExtractRules {
    fn default() -> Self {
        Self {
            match_id_header: DEFAULT_MATCH_ID_HEADER.to_string(),
            header_markers: DEFAULT_HEADER_MARKERS.iter().map(|m| m.to_string()).collect(),
            units: UnitAliases::default(),
        }
    }
}

/// One header row and the rows up to the next header (or the end of the grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Block {
    pub header_row: usize,
    pub first_row: usize,
    pub last_row: usize,
}

impl Block {
    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.first_row..=self.last_row
    }
}

/// Find every header block in the grid.
///
/// `layout.header_row` is always the first header. For paged layouts any
/// later row whose marker cell, trimmed, equals one of `markers` starts a
/// new block. A grid shorter than the header row has no blocks.
pub fn locate_blocks(grid: &dyn CellGrid, layout: &LayoutDescriptor, markers: &[String]) -> Vec<Block> {
    let max_row = grid.max_row();
    if layout.header_row == 0 || max_row < layout.header_row {
        return Vec::new();
    }

    let mut headers = vec![layout.header_row];
    if layout.paged {
        for row in layout.header_row + 1..=max_row {
            let marker = grid.cell(row, layout.marker).to_text();
            let marker = marker.trim();
            if markers.iter().any(|m| m == marker) {
                headers.push(row);
            }
        }
    }

    headers
        .iter()
        .enumerate()
        .map(|(i, &header_row)| {
            let last_row = headers.get(i + 1).map(|next| next - 1).unwrap_or(max_row);
            Block {
                header_row,
                first_row: header_row + 1,
                last_row,
            }
        })
        .collect()
}

/// A data row carries a sequence number: a numeric cell, or text made only
/// of decimal digits once trimmed.
pub fn is_data_row(marker: &CellValue) -> bool {
    match marker {
        CellValue::Number(_) => true,
        CellValue::Text(s) => {
            let s = s.trim();
            !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
        }
        CellValue::Empty | CellValue::Bool(_) => false,
    }
}

/// Normalize one grid row. `None` when both code and name are blank.
pub fn read_record(
    grid: &dyn CellGrid,
    row: usize,
    layout: &LayoutDescriptor,
    units: &UnitAliases,
) -> Option<NormalizedRecord> {
    let product_code = normalize_product_code(&grid.cell(row, layout.code));
    let item_name = normalize_text(&grid.cell(row, layout.name));
    if product_code.is_empty() && item_name.is_empty() {
        return None;
    }

    let unit_label = normalize_text(&grid.cell(row, layout.unit));
    let unit = units.normalize_str(&unit_label);
    let [opening_qty, opening_value, receive_qty, receive_value, issue_qty, issue_value, closing_qty, closing_value] =
        layout.figure_columns().map(|col| normalize_numeric(&grid.cell(row, col)));

    Some(NormalizedRecord {
        source_row: row,
        product_code,
        item_name,
        unit,
        unit_label,
        opening_qty,
        opening_value,
        receive_qty,
        receive_value,
        issue_qty,
        issue_value,
        closing_qty,
        closing_value,
    })
}

/// Extract with an already-chosen layout.
pub fn extract_with_layout(
    grid: &dyn CellGrid,
    layout: &LayoutDescriptor,
    rules: &ExtractRules,
) -> Vec<NormalizedRecord> {
    let mut records = Vec::new();
    for block in locate_blocks(grid, layout, &rules.header_markers) {
        for row in block.rows() {
            if !is_data_row(&grid.cell(row, layout.marker)) {
                continue;
            }
            match read_record(grid, row, layout, &rules.units) {
                Some(record) => {
                    log::trace!(
                        "row {row}: code='{}' name='{}' unit='{}'",
                        record.product_code,
                        record.item_name,
                        record.unit
                    );
                    records.push(record);
                }
                None => log::trace!("row {row}: blank code and name, skipped"),
            }
        }
    }
    records
}

/// Detect the layout of `grid` from `base`, then extract every record.
///
/// Pure: re-extracting the same grid yields the same sequence, ordered by
/// ascending source row.
pub fn extract_records(
    grid: &dyn CellGrid,
    base: &LayoutDescriptor,
    rules: &ExtractRules,
) -> Vec<NormalizedRecord> {
    if grid.max_row() < base.header_row {
        log::warn!(
            "grid has {} rows, header row {} not present; no records extracted",
            grid.max_row(),
            base.header_row
        );
        return Vec::new();
    }
    let layout = detect_layout(grid, base, &rules.match_id_header);
    extract_with_layout(grid, &layout, rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MemoryGrid;
    use crate::layout::SourceKind;
    use crate::model::Amount;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    /// System-layout row: SL, code, name, (desc), unit, 8 figures.
    fn system_row(sl: CellValue, code: &str, name: &str, unit: &str, fig: f64) -> Vec<CellValue> {
        let mut row = vec![sl, text(code), text(name), CellValue::Empty, text(unit)];
        row.extend((0..8).map(|_| CellValue::Number(fig)));
        row
    }

    fn paged_grid() -> MemoryGrid {
        let mut grid = MemoryGrid::new();
        grid.set(1, 1, "Detailed Stock Report");
        grid.set(5, 1, "SL\nNo");
        grid.set_row(6, system_row(CellValue::Number(1.0), "A 1", "Bolt", "pcs", 1.0));
        grid.set_row(7, system_row(text(" 2 "), "A2", "Nut", "Pieces", 2.0));
        grid.set_row(8, system_row(text("Total"), "", "", "", 3.0));
        grid.set(9, 1, "SL No");
        grid.set_row(10, system_row(text("3"), "", "Washer", "kg", 4.0));
        grid.set_row(11, system_row(text("4"), "", "", "kg", 5.0));
        grid.set_row(12, system_row(CellValue::Empty, "B1", "Orphan", "kg", 6.0));
        grid
    }

    #[test]
    fn data_row_markers() {
        assert!(is_data_row(&CellValue::Number(3.0)));
        assert!(is_data_row(&text(" 12 ")));
        assert!(!is_data_row(&text("12a")));
        assert!(!is_data_row(&text("")));
        assert!(!is_data_row(&text("SL No")));
        assert!(!is_data_row(&CellValue::Empty));
    }

    #[test]
    fn locates_page_blocks() {
        let grid = paged_grid();
        let layout = LayoutDescriptor::for_kind(SourceKind::System);
        let blocks = locate_blocks(&grid, &layout, &ExtractRules::default().header_markers);
        assert_eq!(
            blocks,
            vec![
                Block { header_row: 5, first_row: 6, last_row: 8 },
                Block { header_row: 9, first_row: 10, last_row: 12 },
            ]
        );
    }

    #[test]
    fn unpaged_layout_has_single_block() {
        let grid = paged_grid();
        let layout = LayoutDescriptor::for_kind(SourceKind::Manual);
        let blocks = locate_blocks(&grid, &layout, &ExtractRules::default().header_markers);
        assert_eq!(blocks, vec![Block { header_row: 5, first_row: 6, last_row: 12 }]);
    }

    #[test]
    fn extracts_data_rows_across_pages() {
        let grid = paged_grid();
        let records = extract_records(
            &grid,
            &LayoutDescriptor::for_kind(SourceKind::System),
            &ExtractRules::default(),
        );
        let rows: Vec<usize> = records.iter().map(|r| r.source_row).collect();
        assert_eq!(rows, vec![6, 7, 10]);

        assert_eq!(records[0].product_code, "A1");
        assert_eq!(records[0].unit, "PCS");
        assert_eq!(records[0].unit_label, "pcs");
        assert_eq!(records[1].unit, "PCS");
        assert_eq!(records[1].closing_value, Amount::from_hundredths(200));
        assert_eq!(records[2].product_code, "");
        assert_eq!(records[2].item_name, "Washer");
    }

    #[test]
    fn shifted_layout_is_detected_before_scanning() {
        let mut grid = MemoryGrid::new();
        grid.set(5, 1, "Match ID");
        grid.set(5, 2, "SL # ");
        let mut row = vec![text("RM0001"), CellValue::Number(1.0), text("x-1"), CellValue::Empty, text("Glue"), text("Ltr")];
        row.extend((0..8).map(|i| text(&format!("{i}"))));
        grid.set_row(6, row);

        let records = extract_records(
            &grid,
            &LayoutDescriptor::for_kind(SourceKind::Manual),
            &ExtractRules::default(),
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_code, "X-1");
        assert_eq!(records[0].item_name, "Glue");
        assert_eq!(records[0].unit, "LTR");
        assert_eq!(records[0].opening_qty, Amount::ZERO);
        assert_eq!(records[0].closing_value, Amount::from_hundredths(700));
    }

    #[test]
    fn short_grid_yields_nothing() {
        let mut grid = MemoryGrid::new();
        grid.set(2, 1, "1");
        let records = extract_records(
            &grid,
            &LayoutDescriptor::for_kind(SourceKind::Manual),
            &ExtractRules::default(),
        );
        assert!(records.is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let grid = paged_grid();
        let layout = LayoutDescriptor::for_kind(SourceKind::System);
        let rules = ExtractRules::default();
        assert_eq!(extract_records(&grid, &layout, &rules), extract_records(&grid, &layout, &rules));
    }
}
