//! Record normalization: raw string table to typed measurement records.
//!
//! Every cell and header is trimmed. Date and time cells are joined with a
//! single space and parsed as one timestamp; numeric cells are coerced to
//! `f64`. Cells that fail coercion become `None` on the record and the row
//! is kept. Only rows with a blank product type or unit id are skipped,
//! since they cannot be assigned to any group.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::config::{ColumnIndices, ColumnRoles, Grouping};
use crate::error::Result;
use crate::record::{MeasurementRecord, Quarter};
use crate::table::RawTable;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// Normalized records plus counts of what had to be degraded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutcome {
    pub records: Vec<MeasurementRecord>,
    /// Rows dropped because product type or unit id was blank.
    pub skipped_rows: usize,
    /// Kept rows whose date/time did not parse.
    pub unparsed_timestamps: usize,
    /// Kept rows whose value did not parse.
    pub unparsed_values: usize,
}

/// Converts a raw table into measurement records.
///
/// Column roles are resolved against the (trimmed) headers first, so a
/// missing column fails before any row is touched.
///
/// # Examples
///
/// ```
/// use cpk_analytics::config::{ColumnRoles, Grouping};
/// use cpk_analytics::normalize::normalize;
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
///     vec![vec!["X", "1", "2024-05-02", "09:00", "10", "12", "8"]],
/// );
/// let out = normalize(&table, &roles, Grouping::ProductQuarter).unwrap();
/// assert_eq!(out.records[0].period.unwrap().to_string(), "2024Q2");
/// ```
pub fn normalize(
    table: &RawTable,
    roles: &ColumnRoles,
    grouping: Grouping,
) -> Result<NormalizeOutcome> {
    let headers: Vec<String> = table.headers.iter().map(|h| h.trim().to_owned()).collect();
    let columns = roles.resolve(&headers)?;
    let quarterly = grouping == Grouping::ProductQuarter;

    let mut outcome = NormalizeOutcome::default();
    for row in 0..table.len() {
        match normalize_row(table, row, &columns, quarterly) {
            Some(record) => {
                if record.timestamp.is_none() {
                    outcome.unparsed_timestamps += 1;
                    debug!(
                        row,
                        date = table.cell(row, columns.date),
                        time = table.cell(row, columns.time),
                        "unparseable timestamp"
                    );
                }
                if record.value.is_none() {
                    outcome.unparsed_values += 1;
                    debug!(row, value = table.cell(row, columns.value), "unparseable value");
                }
                outcome.records.push(record);
            }
            None => {
                outcome.skipped_rows += 1;
                debug!(row, "row has blank product type or unit id");
            }
        }
    }

    if outcome.skipped_rows > 0 {
        warn!(
            skipped = outcome.skipped_rows,
            "rows without product type or unit id were skipped"
        );
    }
    debug!(
        records = outcome.records.len(),
        unparsed_timestamps = outcome.unparsed_timestamps,
        unparsed_values = outcome.unparsed_values,
        "normalized input table"
    );
    Ok(outcome)
}

fn normalize_row(
    table: &RawTable,
    row: usize,
    columns: &ColumnIndices,
    quarterly: bool,
) -> Option<MeasurementRecord> {
    let cell = |column: usize| table.cell(row, column).trim();

    let product_type = cell(columns.product_type);
    let unit_id = cell(columns.unit_id);
    if product_type.is_empty() || unit_id.is_empty() {
        return None;
    }

    let timestamp = parse_timestamp(cell(columns.date), cell(columns.time));
    let period = if quarterly {
        timestamp.as_ref().map(Quarter::of)
    } else {
        None
    };

    Some(MeasurementRecord {
        unit_id: unit_id.to_owned(),
        product_type: product_type.to_owned(),
        timestamp,
        value: parse_number(cell(columns.value)),
        upper_limit: parse_number(cell(columns.upper_limit)),
        lower_limit: parse_number(cell(columns.lower_limit)),
        period,
    })
}

/// Parses a date cell and a time cell joined by one space.
///
/// A date cell that a spreadsheet export rendered as a full datetime
/// (`2024-01-05 00:00:00`) contributes only its date part. An empty time
/// cell yields midnight.
///
/// # Examples
///
/// ```
/// use cpk_analytics::normalize::parse_timestamp;
///
/// let ts = parse_timestamp("2024-01-05", "09:30:00").unwrap();
/// assert_eq!(ts.to_string(), "2024-01-05 09:30:00");
/// assert!(parse_timestamp("not a date", "09:30").is_none());
/// ```
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = date.trim();
    let time = time.trim();
    if date.is_empty() {
        return None;
    }

    let mut date_parts = vec![date];
    if let Some(head) = date.split_whitespace().next() {
        if head != date {
            date_parts.push(head);
        }
    }

    date_parts
        .into_iter()
        .find_map(|d| parse_joined(&format!("{d} {time}")))
}

fn parse_joined(joined: &str) -> Option<NaiveDateTime> {
    let joined = joined.trim();
    for date_fmt in DATE_FORMATS {
        for time_fmt in TIME_FORMATS {
            let fmt = format!("{date_fmt} {time_fmt}");
            if let Ok(ts) = NaiveDateTime::parse_from_str(joined, &fmt) {
                return Some(ts);
            }
        }
        if let Ok(day) = NaiveDate::parse_from_str(joined, date_fmt) {
            return day.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Coerces a cell to a finite number; anything else is `None`.
pub fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
