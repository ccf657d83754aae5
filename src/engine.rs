//! The capability aggregation pipeline.
//!
//! ```text
//! RawTable ──normalize──▶ records ──deduplicate──▶ first readings ──▶ moments ─┐
//!                            └──────────count_volume──────────────────────────┴─▶ join ─▶ classify ─▶ pivot
//! ```
//!
//! A [`CapabilityEngine`] is an immutable configuration; [`CapabilityEngine::run`]
//! is a pure function of its inputs and can be called from any number of
//! threads at once.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::classify::Classifier;
use crate::config::{ColumnRoles, EngineConfig, Grouping};
use crate::dedup::deduplicate;
use crate::error::Result;
use crate::normalize::normalize;
use crate::pivot::PivotTable;
use crate::record::{GroupKey, MeasurementRecord};
use crate::report::{CapabilityReport, GroupStatistics, StatisticsTable};
use crate::statistics::{group_moments, GroupMoments};
use crate::table::RawTable;
use crate::volume::{count_volume, dataset_volume, Volume};

/// Configured pipeline.
///
/// # Examples
///
/// ```
/// use cpk_analytics::config::{ColumnRoles, EngineConfig};
/// use cpk_analytics::engine::CapabilityEngine;
/// use cpk_analytics::record::GroupKey;
/// use cpk_analytics::table::RawTable;
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
/// let table = RawTable::new(
///     ["Type", "SN", "Date", "Time", "Value", "UL", "LL"],
///     vec![
///         vec!["X", "1", "2024-01-05", "09:00", "10", "12", "8"],
///         vec!["X", "1", "2024-01-05", "10:00", "11", "12", "8"],
///         vec!["X", "2", "2024-01-05", "09:30", "9", "12", "8"],
///     ],
/// );
///
/// let engine = CapabilityEngine::new(EngineConfig::default()).unwrap();
/// let report = engine.run(&table, &roles).unwrap();
/// let x = report.statistics.get(&GroupKey::product("X")).unwrap();
/// assert_eq!(x.mean, Some(9.5));
/// assert_eq!(x.total_tests, 3);
/// assert_eq!(x.unique_unit_count, 2);
/// ```
#[derive(Debug, Clone)]
pub struct CapabilityEngine {
    config: EngineConfig,
    classifier: Classifier,
}

impl CapabilityEngine {
    /// Validates `config` and builds an engine.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let classifier = Classifier::new(config.threshold, config.classification);
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn quarterly(&self) -> bool {
        self.config.grouping == Grouping::ProductQuarter
    }

    /// Runs the full pipeline over a raw table.
    ///
    /// Fails only when a column role cannot be resolved; an empty table
    /// produces an empty report.
    pub fn run(&self, table: &RawTable, roles: &ColumnRoles) -> Result<CapabilityReport> {
        let outcome = normalize(table, roles, self.config.grouping)?;
        let mut report = self.aggregate(&outcome.records);
        report.skipped_rows = outcome.skipped_rows;
        Ok(report)
    }

    /// Runs every stage after normalization over already-typed records.
    pub fn aggregate(&self, records: &[MeasurementRecord]) -> CapabilityReport {
        let quarterly = self.quarterly();
        let unperiodized_records = if quarterly {
            records.iter().filter(|r| r.period.is_none()).count()
        } else {
            0
        };
        if unperiodized_records > 0 {
            warn!(
                count = unperiodized_records,
                "records without a valid timestamp are excluded from quarterly groups"
            );
        }

        let firsts = deduplicate(records, quarterly, self.config.missing_timestamps);
        let moments = group_moments(&firsts, quarterly);
        let volume = count_volume(records, quarterly);
        let statistics = self.join(moments, &volume);

        let pivot = quarterly.then(|| PivotTable::build(&statistics, self.config.display_decimals));
        let totals = dataset_volume(records);

        info!(
            records = records.len(),
            first_readings = firsts.len(),
            groups = statistics.len(),
            total_tests = totals.total_tests,
            unique_units = totals.unique_unit_count,
            "capability aggregation complete"
        );

        CapabilityReport {
            totals,
            skipped_rows: 0,
            unperiodized_records,
            statistics,
            pivot,
        }
    }

    fn join(
        &self,
        moments: BTreeMap<GroupKey, GroupMoments>,
        volume: &BTreeMap<GroupKey, Volume>,
    ) -> StatisticsTable {
        let rows = moments
            .into_iter()
            .map(|(key, m)| {
                // Both maps come from the same grouping predicate over the
                // same records, so every statistics key has a volume entry.
                let vol = volume.get(&key).copied().unwrap_or_default();
                if vol.unique_unit_count != m.first_readings {
                    debug!(
                        group = %key,
                        units = vol.unique_unit_count,
                        first_readings = m.first_readings,
                        "volume and first-reading counts disagree"
                    );
                }
                let (code, rate) = self.classifier.classify(m.capability.cpk);
                GroupStatistics {
                    key,
                    mean: m.mean,
                    std: m.std,
                    upper_limit_avg: m.upper_limit_avg,
                    lower_limit_avg: m.lower_limit_avg,
                    cpk_upper: m.capability.cpk_upper,
                    cpk_lower: m.capability.cpk_lower,
                    cpk: m.capability.cpk,
                    total_tests: vol.total_tests,
                    unique_unit_count: vol.unique_unit_count,
                    code,
                    rate,
                }
            })
            .collect();
        StatisticsTable { rows }
    }
}
