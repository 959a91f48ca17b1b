use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::extract::{ExtractRules, DEFAULT_HEADER_MARKERS, DEFAULT_MATCH_ID_HEADER};
use crate::layout::{LayoutDescriptor, SourceKind};
use crate::normalize::UnitAliases;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Reconciliation settings. Every section is optional; the defaults describe
/// a paged system export against a manual workbook with `RM` and
/// `Consumable` sheets.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "SourceConfig::system")]
    pub left: SourceConfig,
    #[serde(default = "SourceConfig::manual")]
    pub right: SourceConfig,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
    #[serde(default)]
    pub layouts: LayoutsConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    /// Extra unit clusters: canonical token → synonyms. Merged over the
    /// built-in table.
    #[serde(default)]
    pub units: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            left: SourceConfig::system(),
            right: SourceConfig::manual(),
            categories: default_categories(),
            layouts: LayoutsConfig::default(),
            extract: ExtractConfig::default(),
            units: BTreeMap::new(),
            report: ReportConfig::default(),
        }
    }
}

fn default_name() -> String {
    "Stock reconciliation".into()
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig {
            prefix: "RM".into(),
            label: Some("RM".into()),
            sheet: "RM".into(),
        },
        CategoryConfig {
            prefix: "CON".into(),
            label: Some("Consumable".into()),
            sheet: "Consumable".into(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Sources + categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    pub label: String,
    /// Sheet to read. The first sheet when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
}

impl SourceConfig {
    fn system() -> Self {
        Self {
            label: "System".into(),
            sheet: None,
        }
    }

    fn manual() -> Self {
        Self {
            label: "Manual".into(),
            sheet: None,
        }
    }
}

/// One right-side sub-population, matched in its own pass.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryConfig {
    /// Match-id prefix, used verbatim (e.g. `RM` → `RM0001`).
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub sheet: String,
}

impl CategoryConfig {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.prefix)
    }
}

// ---------------------------------------------------------------------------
// Layouts + extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayoutsConfig {
    #[serde(default = "system_layout")]
    pub system: LayoutDescriptor,
    #[serde(default = "manual_layout")]
    pub manual: LayoutDescriptor,
}

fn system_layout() -> LayoutDescriptor {
    LayoutDescriptor::for_kind(SourceKind::System)
}

fn manual_layout() -> LayoutDescriptor {
    LayoutDescriptor::for_kind(SourceKind::Manual)
}

impl Default for LayoutsConfig {
    fn default() -> Self {
        Self {
            system: system_layout(),
            manual: manual_layout(),
        }
    }
}

impl LayoutsConfig {
    pub fn for_kind(&self, kind: SourceKind) -> &LayoutDescriptor {
        match kind {
            SourceKind::System => &self.system,
            SourceKind::Manual => &self.manual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Header-row label that marks an inserted match-id column.
    pub match_id_header: String,
    /// Marker-cell literals that start a new header block.
    pub header_markers: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            match_id_header: DEFAULT_MATCH_ID_HEADER.into(),
            header_markers: DEFAULT_HEADER_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Entries shown per unmatched list before "...and N more".
    pub preview_limit: usize,
    /// Assignments listed in the post-run match summary.
    pub summary_limit: usize,
    /// Characters of item name shown in unmatched lists.
    pub name_preview_chars: usize,
    /// Characters of item name shown in the match summary.
    pub summary_name_chars: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            preview_limit: 100,
            summary_limit: 10,
            name_preview_chars: 60,
            summary_name_chars: 40,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.categories.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one category is required".into(),
            ));
        }

        let mut prefixes = HashSet::new();
        for cat in &self.categories {
            if cat.prefix.is_empty() || !cat.prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ReconError::ConfigValidation(format!(
                    "category prefix '{}' must be non-empty and alphanumeric",
                    cat.prefix
                )));
            }
            if !prefixes.insert(cat.prefix.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate category prefix '{}'",
                    cat.prefix
                )));
            }
            if cat.sheet.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "category '{}': sheet must not be empty",
                    cat.prefix
                )));
            }
        }

        for (kind, layout) in [
            (SourceKind::System, &self.layouts.system),
            (SourceKind::Manual, &self.layouts.manual),
        ] {
            if layout.header_row == 0 || layout.columns().any(|c| c == 0) {
                return Err(ReconError::ConfigValidation(format!(
                    "layout '{kind}': rows and columns are 1-based"
                )));
            }
        }

        if self.report.preview_limit == 0 {
            return Err(ReconError::ConfigValidation(
                "report.preview_limit must be at least 1".into(),
            ));
        }

        self.unit_aliases()?;
        Ok(())
    }

    /// Built-in unit table with the configured clusters merged on top.
    pub fn unit_aliases(&self) -> Result<UnitAliases, ReconError> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        let mut aliases = UnitAliases::default();
        for (canonical, synonyms) in &self.units {
            if canonical.trim().is_empty() {
                return Err(ReconError::ConfigValidation(
                    "unit alias with empty canonical token".into(),
                ));
            }
            for synonym in synonyms {
                let key = synonym.trim().to_uppercase();
                if let Some(previous) = seen.insert(key.clone(), canonical) {
                    if !previous.eq_ignore_ascii_case(canonical) {
                        return Err(ReconError::ConfigValidation(format!(
                            "unit '{key}' maps to both '{previous}' and '{canonical}'"
                        )));
                    }
                }
            }
            aliases.insert_cluster(canonical, synonyms.iter().map(String::as_str));
        }
        Ok(aliases)
    }

    pub fn extract_rules(&self) -> Result<ExtractRules, ReconError> {
        Ok(ExtractRules {
            match_id_header: self.extract.match_id_header.clone(),
            header_markers: self.extract.header_markers.clone(),
            units: self.unit_aliases()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
name = "Aug-25 closing"

[left]
label = "Odoo"
sheet = "Stock"

[right]
label = "Manual"

[[categories]]
prefix = "RM"
sheet = "RM"

[[categories]]
prefix = "CON"
label = "Consumable"
sheet = "Consumable"

[layouts.manual]
header_row = 4
marker = 1
code = 2
name = 3
unit = 4
numeric_start = 5

[extract]
header_markers = ["S/N"]

[units]
BOX = ["boxes", "bx"]

[report]
preview_limit = 25
"#;

    #[test]
    fn empty_config_is_default() {
        let config = ReconConfig::from_toml("").unwrap();
        assert_eq!(config, ReconConfig::default());
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[1].display_label(), "Consumable");
        assert_eq!(config.report.preview_limit, 100);
        assert_eq!(config.extract.match_id_header, "Match ID");
    }

    #[test]
    fn parse_full() {
        let config = ReconConfig::from_toml(FULL).unwrap();
        assert_eq!(config.name, "Aug-25 closing");
        assert_eq!(config.left.label, "Odoo");
        assert_eq!(config.left.sheet.as_deref(), Some("Stock"));
        assert_eq!(config.right.sheet, None);
        assert_eq!(config.categories[0].display_label(), "RM");
        assert_eq!(config.layouts.manual.header_row, 4);
        assert!(!config.layouts.manual.paged);
        assert_eq!(config.layouts.system, LayoutDescriptor::for_kind(SourceKind::System));
        assert_eq!(config.extract.header_markers, vec!["S/N"]);
        assert_eq!(config.extract.match_id_header, "Match ID");
        assert_eq!(config.report.preview_limit, 25);
        assert_eq!(config.report.summary_limit, 10);

        let units = config.unit_aliases().unwrap();
        assert_eq!(units.normalize_str("Boxes"), "BOX");
        assert_eq!(units.normalize_str("pieces"), "PCS");
    }

    #[test]
    fn default_round_trips_through_toml() {
        let text = ReconConfig::default().to_toml().unwrap();
        let parsed = ReconConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, ReconConfig::default());
    }

    #[test]
    fn reject_duplicate_prefix() {
        let input = r#"
[[categories]]
prefix = "RM"
sheet = "A"

[[categories]]
prefix = "RM"
sheet = "B"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("duplicate category prefix 'RM'"));
    }

    #[test]
    fn reject_non_alphanumeric_prefix() {
        let input = r#"
[[categories]]
prefix = "R-M"
sheet = "RM"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("alphanumeric"));
    }

    #[test]
    fn reject_zero_column() {
        let input = r#"
[layouts.system]
header_row = 5
marker = 0
code = 2
name = 3
unit = 5
numeric_start = 6
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("layout 'system'"));
    }

    #[test]
    fn reject_conflicting_unit_alias() {
        let input = r#"
[units]
BOX = ["CTN"]
CARTON = ["ctn"]
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("'CTN'"));
    }

    #[test]
    fn reject_empty_categories() {
        let err = ReconConfig::from_toml("categories = []").unwrap_err();
        assert!(err.to_string().contains("at least one category"));
    }

    #[test]
    fn reject_unknown_layout_field_type() {
        let err = ReconConfig::from_toml("[layouts.system]\nheader_row = \"five\"").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}
