//! Engine configuration and column-role mapping.
//!
//! Both are plain immutable values built once by the caller (CLI flags,
//! a TOML file, or code) and passed into the engine. Header lookup by name
//! happens exactly once, in [`ColumnRoles::resolve`]; everything downstream
//! works on typed record fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CpkError, Result};

/// Default capability threshold separating full inspection from sampling.
pub const DEFAULT_THRESHOLD: f64 = 0.95;

/// Default number of decimals applied to displayed statistics.
pub const DEFAULT_DISPLAY_DECIMALS: u32 = 3;

const MAX_DISPLAY_DECIMALS: u32 = 12;

/// How records are bucketed before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// One bucket per product type.
    #[default]
    Product,
    /// One bucket per product type and calendar quarter; enables the pivot.
    ProductQuarter,
}

/// Where records without a valid timestamp sort when choosing a unit's
/// first reading.
///
/// With `Last`, an untimed record only represents its unit when the unit
/// has no timed record in the group at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTimestampPolicy {
    First,
    #[default]
    Last,
}

/// How an undefined capability index is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// Undefined capability yields an undefined code and rate.
    #[default]
    Strict,
    /// Compatibility with the legacy report: undefined capability is
    /// treated as "not below threshold" and gets the reduced-sampling code.
    Lenient,
}

/// Tunables for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub grouping: Grouping,
    pub missing_timestamps: MissingTimestampPolicy,
    pub classification: ClassificationMode,
    /// Cpk below this value escalates to full inspection.
    pub threshold: f64,
    pub display_decimals: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grouping: Grouping::default(),
            missing_timestamps: MissingTimestampPolicy::default(),
            classification: ClassificationMode::default(),
            threshold: DEFAULT_THRESHOLD,
            display_decimals: DEFAULT_DISPLAY_DECIMALS,
        }
    }
}

impl EngineConfig {
    /// Shorthand for the quarterly variant with otherwise default settings.
    pub fn quarterly() -> Self {
        Self {
            grouping: Grouping::ProductQuarter,
            ..Self::default()
        }
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(CpkError::Config(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if self.display_decimals > MAX_DISPLAY_DECIMALS {
            return Err(CpkError::Config(format!(
                "display_decimals must be at most {MAX_DISPLAY_DECIMALS}, got {}",
                self.display_decimals
            )));
        }
        Ok(())
    }
}

/// Names of the input columns playing each logical role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnRoles {
    pub product_type: String,
    pub unit_id: String,
    pub date: String,
    pub time: String,
    pub value: String,
    pub upper_limit: String,
    pub lower_limit: String,
}

/// Column positions resolved from [`ColumnRoles`] against one header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndices {
    pub product_type: usize,
    pub unit_id: usize,
    pub date: usize,
    pub time: usize,
    pub value: usize,
    pub upper_limit: usize,
    pub lower_limit: usize,
}

impl ColumnRoles {
    /// Resolves every role to a header position.
    ///
    /// Headers and role names are compared after trimming. A role whose
    /// column is absent, or whose column name is ambiguous, is an error
    /// reported before any row is read.
    ///
    /// # Examples
    ///
    /// ```
    /// use cpk_analytics::config::ColumnRoles;
    ///
    /// let roles = ColumnRoles {
    ///     product_type: "Type".into(),
    ///     unit_id: "SN".into(),
    ///     date: "Date".into(),
    ///     time: "Time".into(),
    ///     value: "Value".into(),
    ///     upper_limit: "UL".into(),
    ///     lower_limit: "LL".into(),
    /// };
    /// let headers: Vec<String> = ["Type", " SN ", "Date", "Time", "Value", "UL", "LL"]
    ///     .iter()
    ///     .map(|s| s.to_string())
    ///     .collect();
    /// let idx = roles.resolve(&headers).unwrap();
    /// assert_eq!(idx.unit_id, 1);
    /// ```
    pub fn resolve(&self, headers: &[String]) -> Result<ColumnIndices> {
        let find = |role: &'static str, column: &str| -> Result<usize> {
            let wanted = column.trim();
            let mut hits = headers
                .iter()
                .enumerate()
                .filter(|(_, h)| h.trim() == wanted)
                .map(|(i, _)| i);
            let first = hits.next().ok_or_else(|| CpkError::MissingField {
                role,
                column: wanted.to_owned(),
            })?;
            if hits.next().is_some() {
                return Err(CpkError::DuplicateColumn(wanted.to_owned()));
            }
            Ok(first)
        };

        Ok(ColumnIndices {
            product_type: find("product_type", &self.product_type)?,
            unit_id: find("unit_id", &self.unit_id)?,
            date: find("date", &self.date)?,
            time: find("time", &self.time)?,
            value: find("value", &self.value)?,
            upper_limit: find("upper_limit", &self.upper_limit)?,
            lower_limit: find("lower_limit", &self.lower_limit)?,
        })
    }
}

/// On-disk configuration: an `[engine]` table and an optional `[columns]`
/// table.
///
/// ```toml
/// [engine]
/// grouping = "product_quarter"
/// threshold = 0.95
///
/// [columns]
/// product_type = "Type"
/// unit_id = "SN"
/// date = "Date"
/// time = "Time"
/// value = "Value"
/// upper_limit = "UL"
/// lower_limit = "LL"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub engine: EngineConfig,
    pub columns: Option<ColumnRoles>,
}

impl ConfigFile {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        file.engine.validate()?;
        Ok(file)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn roles() -> ColumnRoles {
        ColumnRoles {
            product_type: "Type".into(),
            unit_id: "SN".into(),
            date: "Date".into(),
            time: "Time".into(),
            value: "Value".into(),
            upper_limit: "UL".into(),
            lower_limit: "LL".into(),
        }
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // -----------------------------------------------------------------------
    // Column resolution
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_finds_trimmed_headers() {
        let h = headers(&["LL", " UL", "Value ", "Time", "Date", "SN", "Type"]);
        let idx = roles().resolve(&h).unwrap();
        assert_eq!(idx.product_type, 6);
        assert_eq!(idx.unit_id, 5);
        assert_eq!(idx.upper_limit, 1);
        assert_eq!(idx.value, 2);
        assert_eq!(idx.lower_limit, 0);
    }

    #[test]
    fn resolve_reports_missing_role() {
        let h = headers(&["Type", "SN", "Date", "Time", "Value", "UL"]);
        match roles().resolve(&h) {
            Err(CpkError::MissingField { role, column }) => {
                assert_eq!(role, "lower_limit");
                assert_eq!(column, "LL");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn resolve_rejects_ambiguous_header() {
        let h = headers(&["Type", "SN", "SN ", "Date", "Time", "Value", "UL", "LL"]);
        assert!(matches!(
            roles().resolve(&h),
            Err(CpkError::DuplicateColumn(c)) if c == "SN"
        ));
    }

    // -----------------------------------------------------------------------
    // Engine config
    // -----------------------------------------------------------------------

    #[test]
    fn default_config_is_strict_product_grouping() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.grouping, Grouping::Product);
        assert_eq!(cfg.missing_timestamps, MissingTimestampPolicy::Last);
        assert_eq!(cfg.classification, ClassificationMode::Strict);
        assert_eq!(cfg.threshold, 0.95);
        assert_eq!(cfg.display_decimals, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cfg = EngineConfig {
            threshold: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = EngineConfig {
            display_decimals: 40,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_round_trip_with_columns() {
        let text = r#"
            [engine]
            grouping = "product_quarter"
            classification = "lenient"
            threshold = 1.33

            [columns]
            product_type = "Type"
            unit_id = "SN"
            date = "Date"
            time = "Time"
            value = "Value"
            upper_limit = "UL"
            lower_limit = "LL"
        "#;
        let file = ConfigFile::from_toml_str(text).unwrap();
        assert_eq!(file.engine.grouping, Grouping::ProductQuarter);
        assert_eq!(file.engine.classification, ClassificationMode::Lenient);
        assert_eq!(file.engine.missing_timestamps, MissingTimestampPolicy::Last);
        assert_eq!(file.engine.threshold, 1.33);
        assert_eq!(file.columns, Some(roles()));
    }

    #[test]
    fn toml_empty_document_uses_defaults() {
        let file = ConfigFile::from_toml_str("").unwrap();
        assert_eq!(file.engine, EngineConfig::default());
        assert!(file.columns.is_none());
    }

    #[test]
    fn toml_unknown_key_is_rejected() {
        let err = ConfigFile::from_toml_str("[engine]\nthreshhold = 1.0\n").unwrap_err();
        assert!(matches!(err, CpkError::Toml(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nmissing_timestamps = \"first\"").unwrap();
        file.flush().unwrap();
        let cfg = ConfigFile::load(file.path()).unwrap();
        assert_eq!(cfg.engine.missing_timestamps, MissingTimestampPolicy::First);
    }
}
