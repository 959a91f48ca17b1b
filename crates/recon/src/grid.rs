use crate::model::CellValue;

/// Read-only, 1-based view of one sheet of a source document.
///
/// Implemented by the IO layer over whatever reader produced the cells.
/// Out-of-range lookups return [`CellValue::Empty`].
pub trait CellGrid {
    fn cell(&self, row: usize, col: usize) -> CellValue;
    fn max_row(&self) -> usize;
    fn max_column(&self) -> usize;
}

/// Dense in-memory grid. Row 1 is `rows[0]`; rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryGrid {
    rows: Vec<Vec<CellValue>>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Set a cell, growing the grid as needed.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<CellValue>) {
        if row == 0 || col == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < col {
            cells.resize(col, CellValue::Empty);
        }
        cells[col - 1] = value.into();
    }

    /// Replace a whole row starting at column 1.
    pub fn set_row(&mut self, row: usize, values: Vec<CellValue>) {
        if row == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        self.rows[row - 1] = values;
    }
}

impl CellGrid for MemoryGrid {
    fn cell(&self, row: usize, col: usize) -> CellValue {
        if row == 0 || col == 0 {
            return CellValue::Empty;
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .cloned()
            .unwrap_or_default()
    }

    fn max_row(&self) -> usize {
        self.rows.len()
    }

    fn max_column(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A source document made of named sheets, in workbook order.
pub trait SheetSource {
    fn sheet_names(&self) -> Vec<String>;
    fn sheet(&self, name: &str) -> Option<&dyn CellGrid>;

    /// The first sheet, used when a source does not name one.
    fn first_sheet(&self) -> Option<&dyn CellGrid> {
        let names = self.sheet_names();
        names.first().and_then(|name| self.sheet(name))
    }
}

/// Named in-memory sheets. Lookups are exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryWorkbook {
    sheets: Vec<(String, MemoryGrid)>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet, replacing any sheet with the same name.
    pub fn add_sheet(&mut self, name: impl Into<String>, grid: MemoryGrid) {
        let name = name.into();
        match self.sheets.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = grid,
            None => self.sheets.push((name, grid)),
        }
    }

    pub fn with_sheet(mut self, name: impl Into<String>, grid: MemoryGrid) -> Self {
        self.add_sheet(name, grid);
        self
    }
}

impl SheetSource for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(n, _)| n.clone()).collect()
    }

    fn sheet(&self, name: &str) -> Option<&dyn CellGrid> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, g)| g as &dyn CellGrid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workbook_lookup_and_first_sheet() {
        let mut a = MemoryGrid::new();
        a.set(1, 1, "a");
        let mut b = MemoryGrid::new();
        b.set(1, 1, "b");
        let book = MemoryWorkbook::new().with_sheet("Zed", a).with_sheet("Alpha", b);

        assert_eq!(book.sheet_names(), vec!["Zed", "Alpha"]);
        assert_eq!(book.first_sheet().map(|g| g.cell(1, 1)), Some(CellValue::Text("a".into())));
        assert!(book.sheet("Alpha").is_some());
        assert!(book.sheet("alpha").is_none());
    }

    #[test]
    fn set_grows_and_reads_back() {
        let mut grid = MemoryGrid::new();
        grid.set(3, 4, "x");
        assert_eq!(grid.max_row(), 3);
        assert_eq!(grid.max_column(), 4);
        assert_eq!(grid.cell(3, 4), CellValue::Text("x".into()));
        assert_eq!(grid.cell(1, 1), CellValue::Empty);
    }

    #[test]
    fn out_of_range_is_empty() {
        let grid = MemoryGrid::from_rows(vec![vec![CellValue::Number(1.0)]]);
        assert_eq!(grid.cell(0, 1), CellValue::Empty);
        assert_eq!(grid.cell(1, 0), CellValue::Empty);
        assert_eq!(grid.cell(9, 9), CellValue::Empty);
        assert_eq!(grid.cell(1, 1), CellValue::Number(1.0));
    }
}
