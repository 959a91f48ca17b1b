use serde::{Deserialize, Serialize};

use crate::grid::CellGrid;

/// Which kind of document a grid came from. The two kinds lay out their
/// columns differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Automated system-of-record export (left side). Paged: the header
    /// block repeats at every page break.
    System,
    /// Manually maintained spreadsheet (right side). One header block.
    Manual,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Field → column mapping for one grid (all columns 1-based).
///
/// `numeric_start` is the column of opening qty; the remaining seven
/// figures follow in opening → receive → issue → closing, qty before value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayoutDescriptor {
    pub header_row: usize,
    /// Look for repeated header rows below `header_row`.
    #[serde(default)]
    pub paged: bool,
    pub marker: usize,
    pub code: usize,
    pub name: usize,
    pub unit: usize,
    pub numeric_start: usize,
}

impl LayoutDescriptor {
    pub fn for_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::System => Self {
                header_row: 5,
                paged: true,
                marker: 1,
                code: 2,
                name: 3,
                unit: 5,
                numeric_start: 6,
            },
            SourceKind::Manual => Self {
                header_row: 5,
                paged: false,
                marker: 1,
                code: 2,
                name: 4,
                unit: 5,
                numeric_start: 6,
            },
        }
    }

    /// Columns of the eight figure fields in [`crate::model::Field::FIGURES`] order.
    pub fn figure_columns(&self) -> [usize; 8] {
        std::array::from_fn(|i| self.numeric_start + i)
    }

    /// Same layout with every column moved `by` places to the right.
    pub fn shifted(&self, by: usize) -> Self {
        Self {
            header_row: self.header_row,
            paged: self.paged,
            marker: self.marker + by,
            code: self.code + by,
            name: self.name + by,
            unit: self.unit + by,
            numeric_start: self.numeric_start + by,
        }
    }

    /// Every column the layout reads from.
    pub fn columns(&self) -> impl Iterator<Item = usize> {
        [self.marker, self.code, self.name, self.unit]
            .into_iter()
            .chain(self.figure_columns())
    }
}

/// Pick the layout for a grid before scanning it.
///
/// A previous write-back inserts a match-id column in front of the data and
/// labels it in the header row. When column 1 of the header row reads
/// `match_id_header`, every column is one place further right.
pub fn detect_layout(
    grid: &dyn CellGrid,
    base: &LayoutDescriptor,
    match_id_header: &str,
) -> LayoutDescriptor {
    let header = grid.cell(base.header_row, 1).to_text();
    if header.trim() == match_id_header {
        log::debug!("match-id column present; shifting layout by one column");
        base.shifted(1)
    } else {
        *base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MemoryGrid;

    #[test]
    fn figure_columns_follow_numeric_start() {
        let layout = LayoutDescriptor::for_kind(SourceKind::System);
        assert_eq!(layout.figure_columns(), [6, 7, 8, 9, 10, 11, 12, 13]);
    }

    #[test]
    fn kinds_differ_in_name_column() {
        assert_eq!(LayoutDescriptor::for_kind(SourceKind::System).name, 3);
        assert_eq!(LayoutDescriptor::for_kind(SourceKind::Manual).name, 4);
    }

    #[test]
    fn detects_inserted_match_id_column() {
        let base = LayoutDescriptor::for_kind(SourceKind::Manual);
        let mut grid = MemoryGrid::new();
        grid.set(5, 1, " Match ID ");
        let layout = detect_layout(&grid, &base, "Match ID");
        assert_eq!(layout.marker, 2);
        assert_eq!(layout.code, 3);
        assert_eq!(layout.name, 5);
        assert_eq!(layout.unit, 6);
        assert_eq!(layout.figure_columns()[7], 14);
        assert_eq!(layout.header_row, 5);
    }

    #[test]
    fn plain_header_keeps_base_layout() {
        let base = LayoutDescriptor::for_kind(SourceKind::System);
        let mut grid = MemoryGrid::new();
        grid.set(5, 1, "SL No");
        assert_eq!(detect_layout(&grid, &base, "Match ID"), base);
        assert_eq!(detect_layout(&MemoryGrid::new(), &base, "Match ID"), base);
    }
}
