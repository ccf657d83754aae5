//! First-reading selection: one record per unit per group.
//!
//! A unit may be retested many times; only its earliest reading feeds the
//! capability baseline. "Earliest" is defined by [`first_reading_order`]:
//!
//! 1. ascending timestamp;
//! 2. records without a timestamp go to the end chosen by
//!    [`MissingTimestampPolicy`];
//! 3. equal keys keep input order (the sort is stable), so on a timestamp
//!    tie the record that appeared first in the input wins.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use crate::config::MissingTimestampPolicy;
use crate::record::{GroupKey, MeasurementRecord};

/// Orders two records by first-reading precedence.
///
/// Returns `Ordering::Equal` for identical timestamps (and for two missing
/// ones); callers rely on a stable sort for the input-order tie-break.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use cpk_analytics::config::MissingTimestampPolicy;
/// use cpk_analytics::dedup::first_reading_order;
/// use cpk_analytics::normalize::parse_timestamp;
/// use cpk_analytics::record::MeasurementRecord;
///
/// let at = |t: &str| MeasurementRecord {
///     unit_id: "1".into(),
///     product_type: "X".into(),
///     timestamp: parse_timestamp("2024-01-05", t),
///     value: None,
///     upper_limit: None,
///     lower_limit: None,
///     period: None,
/// };
/// let early = at("09:00");
/// let untimed = at("bogus");
///
/// assert_eq!(
///     first_reading_order(&early, &untimed, MissingTimestampPolicy::Last),
///     Ordering::Less
/// );
/// assert_eq!(
///     first_reading_order(&early, &untimed, MissingTimestampPolicy::First),
///     Ordering::Greater
/// );
/// ```
pub fn first_reading_order(
    a: &MeasurementRecord,
    b: &MeasurementRecord,
    policy: MissingTimestampPolicy,
) -> Ordering {
    match (&a.timestamp, &b.timestamp) {
        (Some(x), Some(y)) => x.cmp(y),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => match policy {
            MissingTimestampPolicy::First => Ordering::Less,
            MissingTimestampPolicy::Last => Ordering::Greater,
        },
        (Some(_), None) => match policy {
            MissingTimestampPolicy::First => Ordering::Greater,
            MissingTimestampPolicy::Last => Ordering::Less,
        },
    }
}

/// Keeps the first reading of every (unit, group) pair.
///
/// Records that do not map to a group (no period under quarterly grouping)
/// are not eligible and are left out. The result is in first-reading
/// order, which makes the operation idempotent: deduplicating the output
/// again returns it unchanged.
pub fn deduplicate(
    records: &[MeasurementRecord],
    quarterly: bool,
    policy: MissingTimestampPolicy,
) -> Vec<MeasurementRecord> {
    let mut ordered: Vec<&MeasurementRecord> = records.iter().collect();
    ordered.sort_by(|a, b| first_reading_order(a, b, policy));

    let mut seen: HashSet<(GroupKey, &str)> = HashSet::new();
    let mut firsts = Vec::new();
    for record in ordered {
        let Some(key) = record.group_key(quarterly) else {
            continue;
        };
        if seen.insert((key, record.unit_id.as_str())) {
            firsts.push(record.clone());
        }
    }

    debug!(
        input = records.len(),
        kept = firsts.len(),
        "selected first reading per unit"
    );
    firsts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_timestamp;
    use crate::record::Quarter;

    fn rec(unit: &str, ty: &str, time: &str, value: f64) -> MeasurementRecord {
        MeasurementRecord {
            unit_id: unit.into(),
            product_type: ty.into(),
            timestamp: parse_timestamp("2024-01-05", time),
            value: Some(value),
            upper_limit: Some(12.0),
            lower_limit: Some(8.0),
            period: None,
        }
    }

    fn values(records: &[MeasurementRecord]) -> Vec<f64> {
        records.iter().filter_map(|r| r.value).collect()
    }

    #[test]
    fn keeps_earliest_per_unit() {
        let records = vec![
            rec("1", "X", "10:00", 11.0),
            rec("2", "X", "09:30", 9.0),
            rec("1", "X", "09:00", 10.0),
        ];
        let firsts = deduplicate(&records, false, MissingTimestampPolicy::Last);
        assert_eq!(values(&firsts), vec![10.0, 9.0]);
    }

    #[test]
    fn same_unit_in_two_types_counts_twice() {
        let records = vec![rec("1", "X", "09:00", 1.0), rec("1", "Y", "10:00", 2.0)];
        let firsts = deduplicate(&records, false, MissingTimestampPolicy::Last);
        assert_eq!(firsts.len(), 2);
    }

    #[test]
    fn tie_keeps_input_order() {
        let records = vec![rec("1", "X", "09:00", 1.0), rec("1", "X", "09:00", 2.0)];
        let firsts = deduplicate(&records, false, MissingTimestampPolicy::Last);
        assert_eq!(values(&firsts), vec![1.0]);

        let reversed: Vec<_> = records.into_iter().rev().collect();
        let firsts = deduplicate(&reversed, false, MissingTimestampPolicy::Last);
        assert_eq!(values(&firsts), vec![2.0]);
    }

    #[test]
    fn missing_timestamp_policy_decides_winner() {
        let records = vec![rec("1", "X", "bad", 1.0), rec("1", "X", "09:00", 2.0)];

        let last = deduplicate(&records, false, MissingTimestampPolicy::Last);
        assert_eq!(values(&last), vec![2.0]);

        let first = deduplicate(&records, false, MissingTimestampPolicy::First);
        assert_eq!(values(&first), vec![1.0]);
    }

    #[test]
    fn untimed_only_unit_still_represented() {
        let records = vec![rec("7", "X", "bad", 5.0)];
        let firsts = deduplicate(&records, false, MissingTimestampPolicy::Last);
        assert_eq!(firsts.len(), 1);
    }

    #[test]
    fn quarterly_groups_by_period_and_drops_unperiodized() {
        let q1 = Quarter::new(2024, 1);
        let q2 = Quarter::new(2024, 2);
        let mut a = rec("1", "X", "09:00", 1.0);
        a.period = q1;
        let mut b = rec("1", "X", "10:00", 2.0);
        b.period = q2;
        let mut c = rec("1", "X", "11:00", 3.0);
        c.period = q2;
        let d = rec("2", "X", "bad", 4.0);

        let firsts = deduplicate(&[a, b, c, d], true, MissingTimestampPolicy::Last);
        assert_eq!(values(&firsts), vec![1.0, 2.0]);
    }

    #[test]
    fn comparator_is_consistent() {
        let a = rec("1", "X", "09:00", 1.0);
        let b = rec("1", "X", "10:00", 1.0);
        let none = rec("1", "X", "bad", 1.0);
        for policy in [MissingTimestampPolicy::First, MissingTimestampPolicy::Last] {
            assert_eq!(first_reading_order(&a, &b, policy), Ordering::Less);
            assert_eq!(first_reading_order(&b, &a, policy), Ordering::Greater);
            assert_eq!(first_reading_order(&none, &none, policy), Ordering::Equal);
            assert_eq!(
                first_reading_order(&a, &none, policy),
                first_reading_order(&none, &a, policy).reverse()
            );
        }
    }

    #[test]
    fn empty_input() {
        assert!(deduplicate(&[], true, MissingTimestampPolicy::Last).is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::record::Quarter;
    use crate::volume::count_volume;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn arb_record() -> impl Strategy<Value = MeasurementRecord> {
        (
            0u8..6,
            0u8..3,
            proptest::option::of(0i64..50),
            proptest::option::of(1u8..=2),
            -10.0_f64..10.0,
        )
            .prop_map(|(unit, ty, minutes, quarter, value)| MeasurementRecord {
                unit_id: unit.to_string(),
                product_type: format!("T{ty}"),
                timestamp: minutes.map(|m| {
                    NaiveDate::from_ymd_opt(2024, 1, 1)
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|t| t + chrono::Duration::minutes(m))
                        .expect("valid base timestamp")
                }),
                value: Some(value),
                upper_limit: Some(20.0),
                lower_limit: Some(-20.0),
                period: quarter.and_then(|q| Quarter::new(2024, q)),
            })
    }

    proptest! {
        #[test]
        fn dedup_is_idempotent(records in proptest::collection::vec(arb_record(), 0..40)) {
            for quarterly in [false, true] {
                for policy in [MissingTimestampPolicy::First, MissingTimestampPolicy::Last] {
                    let once = deduplicate(&records, quarterly, policy);
                    let twice = deduplicate(&once, quarterly, policy);
                    prop_assert_eq!(&once, &twice);
                }
            }
        }

        #[test]
        fn dedup_one_per_unit_and_group(records in proptest::collection::vec(arb_record(), 0..40)) {
            let firsts = deduplicate(&records, false, MissingTimestampPolicy::Last);
            let pairs: HashSet<(String, String)> = records
                .iter()
                .map(|r| (r.product_type.clone(), r.unit_id.clone()))
                .collect();
            prop_assert_eq!(firsts.len(), pairs.len());
        }

        #[test]
        fn unique_units_match_first_readings(
            records in proptest::collection::vec(arb_record(), 0..40),
        ) {
            let firsts = deduplicate(&records, true, MissingTimestampPolicy::Last);
            let volume = count_volume(&records, true);

            let mut per_group: BTreeMap<GroupKey, usize> = BTreeMap::new();
            for first in &firsts {
                if let Some(key) = first.group_key(true) {
                    *per_group.entry(key).or_default() += 1;
                }
            }
            prop_assert_eq!(per_group.len(), volume.len());

            for (key, vol) in &volume {
                prop_assert_eq!(per_group.get(key).copied(), Some(vol.unique_unit_count));

                let mut seen = HashSet::new();
                let retested = records
                    .iter()
                    .filter(|r| r.group_key(true).as_ref() == Some(key))
                    .any(|r| !seen.insert(r.unit_id.as_str()));
                prop_assert_eq!(vol.total_tests == vol.unique_unit_count, !retested);
            }
        }
    }
}
