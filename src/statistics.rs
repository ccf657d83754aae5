//! Per-group statistics over first readings.
//!
//! For each group: the mean and sample standard deviation of the measured
//! values, the mean of each specification limit, and the capability
//! indices derived from them. Missing fields are skipped per column, so a
//! record with no value can still contribute its limits.

use std::collections::BTreeMap;

use serde::Serialize;
use u_numflow::stats;

use crate::capability::{CapabilityIndices, ProcessCapability};
use crate::record::{GroupKey, MeasurementRecord};

/// Location, spread, limits and capability of one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupMoments {
    /// Number of first readings in the group.
    pub first_readings: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation; `None` with fewer than two values or
    /// when the values are all identical.
    pub std: Option<f64>,
    pub upper_limit_avg: Option<f64>,
    pub lower_limit_avg: Option<f64>,
    #[serde(flatten)]
    pub capability: CapabilityIndices,
}

#[derive(Default)]
struct Columns {
    count: usize,
    values: Vec<f64>,
    upper: Vec<f64>,
    lower: Vec<f64>,
}

/// Computes [`GroupMoments`] for every group present in `firsts`.
///
/// `firsts` is expected to hold one record per unit per group (see
/// [`crate::dedup::deduplicate`]); records without a group are ignored.
///
/// # Examples
///
/// ```
/// use cpk_analytics::record::{GroupKey, MeasurementRecord};
/// use cpk_analytics::statistics::group_moments;
///
/// let rec = |unit: &str, v: f64| MeasurementRecord {
///     unit_id: unit.into(),
///     product_type: "X".into(),
///     timestamp: None,
///     value: Some(v),
///     upper_limit: Some(12.0),
///     lower_limit: Some(8.0),
///     period: None,
/// };
/// let groups = group_moments(&[rec("1", 10.0), rec("2", 9.0)], false);
/// let x = &groups[&GroupKey::product("X")];
/// assert_eq!(x.mean, Some(9.5));
/// assert!(x.capability.cpk.is_some());
/// ```
pub fn group_moments(
    firsts: &[MeasurementRecord],
    quarterly: bool,
) -> BTreeMap<GroupKey, GroupMoments> {
    let mut columns: BTreeMap<GroupKey, Columns> = BTreeMap::new();
    for record in firsts {
        let Some(key) = record.group_key(quarterly) else {
            continue;
        };
        let col = columns.entry(key).or_default();
        col.count += 1;
        col.values.extend(record.value);
        col.upper.extend(record.upper_limit);
        col.lower.extend(record.lower_limit);
    }

    columns
        .into_iter()
        .map(|(key, col)| (key, moments(&col)))
        .collect()
}

fn moments(col: &Columns) -> GroupMoments {
    let mean = stats::mean(&col.values);
    // Zero spread would put a zero in the capability denominator.
    let std = stats::std_dev(&col.values).filter(|s| *s != 0.0);
    let upper_limit_avg = stats::mean(&col.upper);
    let lower_limit_avg = stats::mean(&col.lower);
    let capability = ProcessCapability::new(upper_limit_avg, lower_limit_avg).indices(mean, std);

    GroupMoments {
        first_readings: col.count,
        mean,
        std,
        upper_limit_avg,
        lower_limit_avg,
        capability,
    }
}
