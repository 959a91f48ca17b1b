use std::fmt;

use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Raw cells
// ---------------------------------------------------------------------------

/// A single scalar read from a source grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Textual form of the cell. Integral numbers print without decimals.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// Largest magnitude [`Amount::from_f64`] accepts.
const MAX_ABS_VALUE: f64 = 9.0e13;

/// Fixed-point decimal with exactly two fractional digits, stored in hundredths.
///
/// Equality is exact: two amounts are equal iff they round to the same
/// hundredth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// Round a float to two fractional digits. Non-finite or out-of-range
    /// values yield `None`.
    ///
    /// Rounding is applied to the exact binary value of `value`, with ties
    /// going to the even hundredth, so `0.125` becomes `0.12` and `2.675`
    /// (stored as 2.67499…) becomes `2.67`.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value.abs() > MAX_ABS_VALUE {
            return None;
        }
        let bits = value.to_bits();
        let exponent = ((bits >> 52) & 0x7ff) as i32;
        let fraction = bits & ((1u64 << 52) - 1);
        // value = mantissa * 2^shift_exp
        let (mantissa, shift_exp) = if exponent == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1u64 << 52), exponent - 1075)
        };

        let scaled = u128::from(mantissa) * 100;
        let magnitude = if shift_exp >= 0 {
            scaled << shift_exp
        } else {
            let shift = shift_exp.unsigned_abs();
            if shift >= 127 {
                0
            } else {
                let quotient = scaled >> shift;
                let remainder = scaled - (quotient << shift);
                let half = 1u128 << (shift - 1);
                if remainder > half || (remainder == half && quotient & 1 == 1) {
                    quotient + 1
                } else {
                    quotient
                }
            }
        };

        let magnitude = i64::try_from(magnitude).ok()?;
        Some(Self(if bits >> 63 == 1 { -magnitude } else { magnitude }))
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl std::ops::Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Comparable fields of a stock line, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ProductCode,
    Unit,
    OpeningQty,
    OpeningValue,
    ReceiveQty,
    ReceiveValue,
    IssueQty,
    IssueValue,
    ClosingQty,
    ClosingValue,
}

impl Field {
    /// The eight quantity/value fields, opening → receive → issue → closing.
    pub const FIGURES: [Field; 8] = [
        Field::OpeningQty,
        Field::OpeningValue,
        Field::ReceiveQty,
        Field::ReceiveValue,
        Field::IssueQty,
        Field::IssueValue,
        Field::ClosingQty,
        Field::ClosingValue,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ProductCode => "Product Code",
            Self::Unit => "Unit",
            Self::OpeningQty => "Opening Qty",
            Self::OpeningValue => "Opening Value",
            Self::ReceiveQty => "Receive Qty",
            Self::ReceiveValue => "Receive Value",
            Self::IssueQty => "Issue Qty",
            Self::IssueValue => "Issue Value",
            Self::ClosingQty => "Closing Qty",
            Self::ClosingValue => "Closing Value",
        }
    }

    pub fn is_figure(&self) -> bool {
        !matches!(self, Self::ProductCode | Self::Unit)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One inventory line read from a source grid, with every field normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    /// 1-based row in the source grid. Write-back identity only.
    pub source_row: usize,
    pub product_code: String,
    pub item_name: String,
    pub unit: String,
    /// Trimmed unit as written in the source, kept for the unit census.
    pub unit_label: String,
    pub opening_qty: Amount,
    pub opening_value: Amount,
    pub receive_qty: Amount,
    pub receive_value: Amount,
    pub issue_qty: Amount,
    pub issue_value: Amount,
    pub closing_qty: Amount,
    pub closing_value: Amount,
}

impl NormalizedRecord {
    /// Value of one of the eight figure fields; `None` for code and unit.
    pub fn figure(&self, field: Field) -> Option<Amount> {
        match field {
            Field::OpeningQty => Some(self.opening_qty),
            Field::OpeningValue => Some(self.opening_value),
            Field::ReceiveQty => Some(self.receive_qty),
            Field::ReceiveValue => Some(self.receive_value),
            Field::IssueQty => Some(self.issue_qty),
            Field::IssueValue => Some(self.issue_value),
            Field::ClosingQty => Some(self.closing_qty),
            Field::ClosingValue => Some(self.closing_value),
            Field::ProductCode | Field::Unit => None,
        }
    }
}

/// Records extracted from the left (system-of-record) document.
#[derive(Debug, Clone)]
pub struct SourceRecords {
    pub label: String,
    pub records: Vec<NormalizedRecord>,
}

/// Records from one right-side sub-population, matched in its own pass.
#[derive(Debug, Clone)]
pub struct CategoryRecords {
    pub prefix: String,
    pub label: String,
    pub records: Vec<NormalizedRecord>,
}

/// Pre-extracted input to a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconInput {
    pub left: SourceRecords,
    pub right_label: String,
    pub categories: Vec<CategoryRecords>,
}

impl ReconInput {
    pub fn right_total(&self) -> usize {
        self.categories.iter().map(|c| c.records.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Match assignment
// ---------------------------------------------------------------------------

/// One committed pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchEntry {
    pub match_id: String,
    pub left_row: usize,
    pub right_row: usize,
    pub product_code: String,
    pub item_name: String,
}

/// The committed pairs of one Match Engine pass, in left-side order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchAssignment {
    pub prefix: String,
    pub entries: Vec<MatchEntry>,
}

impl MatchAssignment {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Discrepancies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDifference {
    pub field: Field,
    pub left: String,
    pub right: String,
}

impl fmt::Display for FieldDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_figure() {
            write!(f, "{}: {} vs {}", self.field, self.left, self.right)
        } else {
            write!(f, "{}: '{}' vs '{}'", self.field, self.left, self.right)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    UnmatchedLeft {
        record: NormalizedRecord,
    },
    UnmatchedRight {
        category: String,
        record: NormalizedRecord,
    },
    NameMatchedValueMismatch {
        category: String,
        left: NormalizedRecord,
        right: NormalizedRecord,
        differences: Vec<FieldDifference>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    UnmatchedLeft,
    UnmatchedRight,
    NameMatchedValueMismatch,
}

impl Discrepancy {
    pub fn kind(&self) -> DiscrepancyKind {
        match self {
            Self::UnmatchedLeft { .. } => DiscrepancyKind::UnmatchedLeft,
            Self::UnmatchedRight { .. } => DiscrepancyKind::UnmatchedRight,
            Self::NameMatchedValueMismatch { .. } => DiscrepancyKind::NameMatchedValueMismatch,
        }
    }

    /// Category prefix of the right-side record involved, if any.
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::UnmatchedLeft { .. } => None,
            Self::UnmatchedRight { category, .. }
            | Self::NameMatchedValueMismatch { category, .. } => Some(category),
        }
    }
}

impl fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedLeft => write!(f, "unmatched_left"),
            Self::UnmatchedRight => write!(f, "unmatched_right"),
            Self::NameMatchedValueMismatch => write!(f, "name_matched_value_mismatch"),
        }
    }
}

// ---------------------------------------------------------------------------
// Report + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub prefix: String,
    pub label: String,
    pub right_total: usize,
    pub matches: usize,
    pub name_mismatches: usize,
    pub unmatched_right: usize,
}

/// How many name-matched mismatches differ in each field group.
/// One mismatch can count in several groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DifferenceBreakdown {
    pub product_code: usize,
    pub unit: usize,
    pub quantity_value: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub left_label: String,
    pub right_label: String,
    pub left_total: usize,
    pub right_total: usize,
    pub total_matches: usize,
    pub categories: Vec<CategorySummary>,
    pub breakdown: DifferenceBreakdown,
    pub discrepancies: Vec<Discrepancy>,
}

impl Report {
    pub fn count(&self, kind: DiscrepancyKind) -> usize {
        self.discrepancies.iter().filter(|d| d.kind() == kind).count()
    }

    pub fn name_mismatches(&self) -> impl Iterator<Item = &Discrepancy> {
        self.of_kind(DiscrepancyKind::NameMatchedValueMismatch)
    }

    pub fn unmatched_left(&self) -> impl Iterator<Item = &Discrepancy> {
        self.of_kind(DiscrepancyKind::UnmatchedLeft)
    }

    pub fn unmatched_right(&self) -> impl Iterator<Item = &Discrepancy> {
        self.of_kind(DiscrepancyKind::UnmatchedRight)
    }

    fn of_kind(&self, kind: DiscrepancyKind) -> impl Iterator<Item = &Discrepancy> {
        self.discrepancies.iter().filter(move |d| d.kind() == kind)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub assignments: Vec<MatchAssignment>,
    pub report: Report,
}

impl ReconResult {
    pub fn total_matches(&self) -> usize {
        self.assignments.iter().map(|a| a.len()).sum()
    }
}

/// Outcome of a run. Zero committed matches is not an error, but nothing
/// downstream (report, write-back) should proceed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconOutcome {
    Reconciled(ReconResult),
    NoMatches { left_total: usize, right_total: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_display() {
        assert_eq!(Amount::from_hundredths(123450).to_string(), "1234.50");
        assert_eq!(Amount::from_hundredths(-5).to_string(), "-0.05");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
    }

    #[test]
    fn amount_rounds_to_hundredths() {
        assert_eq!(Amount::from_f64(10.0), Some(Amount::from_hundredths(1000)));
        assert_eq!(Amount::from_f64(0.125 + 0.0001), Some(Amount::from_hundredths(13)));
        assert_eq!(Amount::from_f64(-2.5), Some(Amount::from_hundredths(-250)));
        assert_eq!(Amount::from_f64(f64::NAN), None);
        assert_eq!(Amount::from_f64(f64::INFINITY), None);
        assert_eq!(Amount::from_f64(1.0e14), None);
    }

    #[test]
    fn amount_ties_round_to_even_on_exact_value() {
        // 0.125 and 0.375 are exact binary ties.
        assert_eq!(Amount::from_f64(0.125), Some(Amount::from_hundredths(12)));
        assert_eq!(Amount::from_f64(0.375), Some(Amount::from_hundredths(38)));
        assert_eq!(Amount::from_f64(-0.125), Some(Amount::from_hundredths(-12)));
        // Decimal-looking ties that are not ties in binary.
        assert_eq!(Amount::from_f64(2.675), Some(Amount::from_hundredths(267)));
        assert_eq!(Amount::from_f64(1.005), Some(Amount::from_hundredths(100)));
        assert_eq!(Amount::from_f64(0.135), Some(Amount::from_hundredths(14)));
        assert_eq!(Amount::from_f64(-0.0), Some(Amount::ZERO));
        assert_eq!(Amount::from_f64(5e-324), Some(Amount::ZERO));
    }

    #[test]
    fn cell_text_of_integral_number() {
        assert_eq!(CellValue::Number(12.0).to_text(), "12");
        assert_eq!(CellValue::Number(12.5).to_text(), "12.5");
        assert_eq!(CellValue::Empty.to_text(), "");
    }

    #[test]
    fn difference_display_quotes_text_fields_only() {
        let code = FieldDifference {
            field: Field::ProductCode,
            left: "X1".into(),
            right: "X2".into(),
        };
        assert_eq!(code.to_string(), "Product Code: 'X1' vs 'X2'");

        let qty = FieldDifference {
            field: Field::ClosingQty,
            left: "10.00".into(),
            right: "12.00".into(),
        };
        assert_eq!(qty.to_string(), "Closing Qty: 10.00 vs 12.00");
    }

    #[test]
    fn figure_order_is_opening_to_closing() {
        assert_eq!(Field::FIGURES[0], Field::OpeningQty);
        assert_eq!(Field::FIGURES[7], Field::ClosingValue);
        assert!(Field::FIGURES.iter().all(Field::is_figure));
    }
}
