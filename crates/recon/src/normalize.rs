//! Field normalization: raw cells into comparable text, codes, units and amounts.

use std::collections::HashMap;

use crate::model::{Amount, CellValue};

const IGNORED_CHARS: [char; 5] = ['$', '₹', '€', '£', ','];

/// Trimmed text; empty cells yield `""`. Case and interior content are kept.
pub fn normalize_text(raw: &CellValue) -> String {
    raw.to_text().trim().to_string()
}

/// Remove every whitespace character and upper-case the rest.
pub fn normalize_product_code(raw: &CellValue) -> String {
    normalize_code_str(&raw.to_text())
}

pub fn normalize_code_str(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Round a cell to two fractional digits.
///
/// Blank markers (`""`, `none`, `-`, em/en dash) are zero. Text wrapped in
/// parentheses is negative (accounting style). Thousands separators, interior
/// whitespace and currency symbols are ignored. Anything still unparseable
/// is zero rather than an error.
pub fn normalize_numeric(raw: &CellValue) -> Amount {
    match raw {
        CellValue::Empty => Amount::ZERO,
        CellValue::Number(n) => Amount::from_f64(*n).unwrap_or(Amount::ZERO),
        CellValue::Bool(b) => {
            if *b {
                Amount::from_hundredths(100)
            } else {
                Amount::ZERO
            }
        }
        CellValue::Text(s) => parse_amount(s).unwrap_or(Amount::ZERO),
    }
}

/// Strict form of the text branch of [`normalize_numeric`]: `None` when the
/// text is not a number under the accounting rules. Blank markers are zero.
pub fn parse_amount(text: &str) -> Option<Amount> {
    let text = text.trim();
    if is_blank_marker(text) {
        return Some(Amount::ZERO);
    }

    let (body, negative) = match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (inner.trim(), true),
        None => (text, false),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !c.is_whitespace() && !IGNORED_CHARS.contains(c))
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return Some(Amount::ZERO);
    }

    let value: f64 = cleaned.parse().ok()?;
    let amount = Amount::from_f64(value)?;
    Some(if negative { -amount } else { amount })
}

fn is_blank_marker(text: &str) -> bool {
    text.is_empty()
        || text.eq_ignore_ascii_case("none")
        || text == "-"
        || text == "\u{2014}"
        || text == "\u{2013}"
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Built-in synonym clusters, canonical token first.
const BUILTIN_UNIT_CLUSTERS: &[(&str, &[&str])] = &[
    ("PCS", &["PCS", "PIECE", "PIECES"]),
    ("FEET", &["FOOT", "FOOT(FT)", "FOOT (FT)", "FEET"]),
    (
        "LITER",
        &["LITER", "LITERS", "LITRE", "LITRES", "LITER(S)", "LITER (S)", "LITRE(S)", "LITRE (S)"],
    ),
    ("GALLON", &["GAL", "GAL(S)", "GAL (S)", "GALLON", "GALLONS"]),
    (
        "SFT",
        &[
            "SQUARE FOOT",
            "SQUARE FEET",
            "SQUARE FOOT(FT)",
            "SQUARE FOOT (FT)",
            "SFT",
            "SQ FT",
            "SQFT",
            "SQ.FT",
            "SQ. FT",
        ],
    ),
    ("POUND", &["LB", "LBS", "LB.", "LBS.", "POUND", "POUNDS"]),
    ("METER", &["METER", "METERS", "METRE", "METRES", "MTR", "MTRS", "MTR.", "MITER"]),
    ("REAM", &["REAM", "REAMS", "RIM", "RIMS"]),
];

/// Synonym table collapsing unit spellings onto one canonical token.
///
/// Keys are stored upper-cased and trimmed, so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitAliases {
    map: HashMap<String, String>,
}

impl Default for UnitAliases {
    fn default() -> Self {
        let mut aliases = Self::empty();
        for (canonical, synonyms) in BUILTIN_UNIT_CLUSTERS {
            aliases.insert_cluster(canonical, synonyms.iter().copied());
        }
        aliases
    }
}

impl UnitAliases {
    pub fn empty() -> Self {
        Self { map: HashMap::new() }
    }

    /// Map every synonym (and the canonical token itself) to `canonical`.
    /// Later clusters override earlier entries for the same synonym.
    pub fn insert_cluster<'a>(
        &mut self,
        canonical: &str,
        synonyms: impl IntoIterator<Item = &'a str>,
    ) {
        let canonical = canonical.trim().to_uppercase();
        self.map.insert(canonical.clone(), canonical.clone());
        for synonym in synonyms {
            self.map.insert(synonym.trim().to_uppercase(), canonical.clone());
        }
    }

    pub fn canonical(&self, unit: &str) -> Option<&str> {
        self.map.get(unit).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Upper-case, trim, then map through the table. Unknown units pass through.
    pub fn normalize(&self, raw: &CellValue) -> String {
        self.normalize_str(&raw.to_text())
    }

    pub fn normalize_str(&self, raw: &str) -> String {
        let unit = raw.trim().to_uppercase();
        match self.canonical(&unit) {
            Some(canonical) => canonical.to_string(),
            None => unit,
        }
    }
}

/// Normalize a unit through the built-in alias table.
pub fn normalize_unit(raw: &CellValue) -> String {
    UnitAliases::default().normalize(raw)
}
