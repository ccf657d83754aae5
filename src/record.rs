//! Typed measurement records and grouping keys.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A calendar quarter, rendered as `YYYY"Q"Q` (e.g. `2024Q1`).
///
/// Ordering is chronological: by year, then quarter.
///
/// # Examples
///
/// ```
/// use cpk_analytics::record::Quarter;
///
/// let q: Quarter = "2024Q3".parse().unwrap();
/// assert_eq!(q.year(), 2024);
/// assert_eq!(q.quarter(), 3);
/// assert_eq!(q.to_string(), "2024Q3");
/// assert!(q < "2025Q1".parse::<Quarter>().unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quarter {
    year: i32,
    quarter: u8,
}

impl Quarter {
    /// Builds a quarter; `None` unless `quarter` is in `1..=4`.
    pub fn new(year: i32, quarter: u8) -> Option<Self> {
        (1..=4).contains(&quarter).then_some(Self { year, quarter })
    }

    /// The quarter containing `timestamp`.
    pub fn of(timestamp: &NaiveDateTime) -> Self {
        Self {
            year: timestamp.year(),
            quarter: (timestamp.month0() / 3 + 1) as u8,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u8 {
        self.quarter
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

/// Error returned when a string is not a `YYYY"Q"Q` quarter label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseQuarterError(String);

impl fmt::Display for ParseQuarterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid quarter label '{}', expected e.g. 2024Q1", self.0)
    }
}

impl std::error::Error for ParseQuarterError {}

impl FromStr for Quarter {
    type Err = ParseQuarterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseQuarterError(s.to_owned());
        let trimmed = s.trim();
        let (year, quarter) = trimmed
            .split_once(|c| c == 'Q' || c == 'q')
            .ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let quarter: u8 = quarter.parse().map_err(|_| err())?;
        Quarter::new(year, quarter).ok_or_else(err)
    }
}

impl Serialize for Quarter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quarter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One observed test event after normalization.
///
/// Fields that failed to parse are `None`; the record itself is kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    pub unit_id: String,
    pub product_type: String,
    pub timestamp: Option<NaiveDateTime>,
    pub value: Option<f64>,
    pub upper_limit: Option<f64>,
    pub lower_limit: Option<f64>,
    /// Quarter of `timestamp`; only populated for quarterly grouping.
    pub period: Option<Quarter>,
}

/// Aggregation bucket: product type, optionally narrowed to a quarter.
///
/// Sorts lexically by product type, then chronologically by period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    pub product_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Quarter>,
}

impl GroupKey {
    /// Key for the simple (product-only) variant.
    pub fn product(product_type: impl Into<String>) -> Self {
        Self {
            product_type: product_type.into(),
            period: None,
        }
    }

    /// Key for the quarterly variant.
    pub fn quarterly(product_type: impl Into<String>, period: Quarter) -> Self {
        Self {
            product_type: product_type.into(),
            period: Some(period),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.period {
            Some(p) => write!(f, "{} {}", self.product_type, p),
            None => f.write_str(&self.product_type),
        }
    }
}

impl MeasurementRecord {
    /// The bucket this record belongs to, or `None` when quarterly grouping
    /// is requested but the record has no period.
    pub fn group_key(&self, quarterly: bool) -> Option<GroupKey> {
        if quarterly {
            self.period
                .map(|p| GroupKey::quarterly(self.product_type.clone(), p))
        } else {
            Some(GroupKey::product(self.product_type.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn quarter_of_month_boundaries() {
        assert_eq!(Quarter::of(&ts(2024, 1, 1)).to_string(), "2024Q1");
        assert_eq!(Quarter::of(&ts(2024, 3, 31)).to_string(), "2024Q1");
        assert_eq!(Quarter::of(&ts(2024, 4, 1)).to_string(), "2024Q2");
        assert_eq!(Quarter::of(&ts(2024, 9, 30)).to_string(), "2024Q3");
        assert_eq!(Quarter::of(&ts(2024, 12, 31)).to_string(), "2024Q4");
    }

    #[test]
    fn quarter_parse_rejects_garbage() {
        assert!("2024Q0".parse::<Quarter>().is_err());
        assert!("2024Q5".parse::<Quarter>().is_err());
        assert!("2024".parse::<Quarter>().is_err());
        assert!("Q1".parse::<Quarter>().is_err());
        assert_eq!("2024q2".parse::<Quarter>(), Ok(Quarter::new(2024, 2).unwrap()));
    }

    #[test]
    fn quarter_ordering_is_chronological() {
        let mut qs: Vec<Quarter> = ["2025Q1", "2024Q4", "2024Q2"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        qs.sort();
        let labels: Vec<String> = qs.iter().map(Quarter::to_string).collect();
        assert_eq!(labels, vec!["2024Q2", "2024Q4", "2025Q1"]);
    }

    #[test]
    fn quarter_serde_as_label() {
        let q = Quarter::new(2024, 1).unwrap();
        assert_eq!(serde_json::to_string(&q).unwrap(), "\"2024Q1\"");
        let back: Quarter = serde_json::from_str("\"2024Q1\"").unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn group_key_ordering() {
        let q1 = Quarter::new(2024, 1).unwrap();
        let q2 = Quarter::new(2024, 2).unwrap();
        let mut keys = vec![
            GroupKey::quarterly("B", q1),
            GroupKey::quarterly("A", q2),
            GroupKey::quarterly("A", q1),
        ];
        keys.sort();
        assert_eq!(keys[0], GroupKey::quarterly("A", q1));
        assert_eq!(keys[1], GroupKey::quarterly("A", q2));
        assert_eq!(keys[2], GroupKey::quarterly("B", q1));
    }

    #[test]
    fn group_key_requires_period_when_quarterly() {
        let record = MeasurementRecord {
            unit_id: "1".into(),
            product_type: "X".into(),
            timestamp: None,
            value: Some(1.0),
            upper_limit: None,
            lower_limit: None,
            period: None,
        };
        assert_eq!(record.group_key(false), Some(GroupKey::product("X")));
        assert_eq!(record.group_key(true), None);
    }
}
