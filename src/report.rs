//! Long-format statistics table: one row per group.

use serde::Serialize;

use crate::classify::{InspectionCode, SamplingRate};
use crate::pivot::PivotTable;
use crate::record::{GroupKey, Quarter};
use crate::volume::Volume;

/// Rounds `value` to `decimals` places, half away from zero.
///
/// ```
/// use cpk_analytics::report::round_to;
/// assert_eq!(round_to(1.23456, 3), 1.235);
/// assert_eq!(round_to(-0.0004, 3), -0.0);
/// ```
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Everything reported for one group.
///
/// Numeric fields carry full precision; use [`GroupStatistics::rounded`]
/// for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStatistics {
    #[serde(flatten)]
    pub key: GroupKey,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub upper_limit_avg: Option<f64>,
    pub lower_limit_avg: Option<f64>,
    pub cpk_upper: Option<f64>,
    pub cpk_lower: Option<f64>,
    pub cpk: Option<f64>,
    pub total_tests: usize,
    pub unique_unit_count: usize,
    pub code: InspectionCode,
    pub rate: SamplingRate,
}

impl GroupStatistics {
    /// Copy with every numeric statistic rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> Self {
        let r = |v: Option<f64>| v.map(|x| round_to(x, decimals));
        Self {
            key: self.key.clone(),
            mean: r(self.mean),
            std: r(self.std),
            upper_limit_avg: r(self.upper_limit_avg),
            lower_limit_avg: r(self.lower_limit_avg),
            cpk_upper: r(self.cpk_upper),
            cpk_lower: r(self.cpk_lower),
            cpk: r(self.cpk),
            total_tests: self.total_tests,
            unique_unit_count: self.unique_unit_count,
            code: self.code,
            rate: self.rate,
        }
    }
}

/// Rows ordered by group key: product type, then period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatisticsTable {
    pub rows: Vec<GroupStatistics>,
}

impl StatisticsTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for `key`, if that group exists.
    pub fn get(&self, key: &GroupKey) -> Option<&GroupStatistics> {
        self.rows
            .binary_search_by(|row| row.key.cmp(key))
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Distinct periods present, in chronological order.
    pub fn periods(&self) -> Vec<Quarter> {
        let mut periods: Vec<Quarter> = self.rows.iter().filter_map(|r| r.key.period).collect();
        periods.sort_unstable();
        periods.dedup();
        periods
    }

    /// Only the rows whose period is in `periods`.
    ///
    /// Rows without a period (simple grouping) never match.
    pub fn for_periods(&self, periods: &[Quarter]) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|r| r.key.period.is_some_and(|p| periods.contains(&p)))
                .cloned()
                .collect(),
        }
    }

    /// Display copy with every row rounded.
    pub fn rounded(&self, decimals: u32) -> Self {
        Self {
            rows: self.rows.iter().map(|r| r.rounded(decimals)).collect(),
        }
    }
}

/// Output of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapabilityReport {
    /// Test volume over every normalized record.
    pub totals: Volume,
    /// Input rows dropped for a blank product type or unit id.
    pub skipped_rows: usize,
    /// Records left out of quarterly grouping for lack of a timestamp.
    pub unperiodized_records: usize,
    pub statistics: StatisticsTable,
    /// Present only for quarterly grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<PivotTable>,
}

impl CapabilityReport {
    /// Restricts statistics and pivot to the given periods.
    pub fn for_periods(&self, periods: &[Quarter]) -> Self {
        Self {
            totals: self.totals,
            skipped_rows: self.skipped_rows,
            unperiodized_records: self.unperiodized_records,
            statistics: self.statistics.for_periods(periods),
            pivot: self.pivot.as_ref().map(|p| p.select_periods(periods)),
        }
    }
}
