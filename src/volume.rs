//! Test volume per group, over every record including retests.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::record::{GroupKey, MeasurementRecord};

/// How many tests a group saw, and on how many distinct units.
///
/// `unique_unit_count <= total_tests`, with equality iff no unit was
/// retested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Volume {
    pub total_tests: usize,
    pub unique_unit_count: usize,
}

/// Counts tests and distinct units per group over the undeduplicated set.
///
/// Records without a group (no period under quarterly grouping) are not
/// counted, matching the groups the statistics are computed for.
pub fn count_volume(
    records: &[MeasurementRecord],
    quarterly: bool,
) -> BTreeMap<GroupKey, Volume> {
    let mut units: BTreeMap<GroupKey, (usize, HashSet<&str>)> = BTreeMap::new();
    for record in records {
        let Some(key) = record.group_key(quarterly) else {
            continue;
        };
        let (tests, seen) = units.entry(key).or_default();
        *tests += 1;
        seen.insert(record.unit_id.as_str());
    }

    units
        .into_iter()
        .map(|(key, (total_tests, seen))| {
            (
                key,
                Volume {
                    total_tests,
                    unique_unit_count: seen.len(),
                },
            )
        })
        .collect()
}

/// Dataset-wide volume across every normalized record, regardless of group.
pub fn dataset_volume(records: &[MeasurementRecord]) -> Volume {
    let unique: HashSet<&str> = records.iter().map(|r| r.unit_id.as_str()).collect();
    Volume {
        total_tests: records.len(),
        unique_unit_count: unique.len(),
    }
}
