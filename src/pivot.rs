//! Wide pivot of quarterly statistics for trend charting.
//!
//! One row per product type; for each period, in chronological order, a
//! cluster of five columns:
//!
//! | column | content |
//! |--------|---------|
//! | `{period} cpk` | capability index |
//! | `{period} std` | sample standard deviation |
//! | `{period} code` | inspection code |
//! | `{period} rate` | sampling rate |
//! | `{period} Total SN` | units tested (unique unit count) |
//!
//! A product type with no data in a period has *absent* cells there, never
//! zeros. A group that exists but has an undefined statistic shows
//! [`PivotCell::Undefined`] instead.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::classify::{InspectionCode, SamplingRate};
use crate::record::Quarter;
use crate::report::{round_to, GroupStatistics, StatisticsTable};

/// The per-period metrics, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PivotMetric {
    Cpk,
    Std,
    Code,
    Rate,
    TotalSn,
}

impl PivotMetric {
    pub const ALL: [PivotMetric; 5] = [
        PivotMetric::Cpk,
        PivotMetric::Std,
        PivotMetric::Code,
        PivotMetric::Rate,
        PivotMetric::TotalSn,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cpk => "cpk",
            Self::Std => "std",
            Self::Code => "code",
            Self::Rate => "rate",
            Self::TotalSn => "Total SN",
        }
    }

    /// Column name for this metric in `period`, e.g. `2024Q1 cpk`.
    pub fn column(&self, period: Quarter) -> String {
        format!("{period} {}", self.label())
    }

    fn cell(&self, row: &GroupStatistics, decimals: u32) -> PivotCell {
        let number = |v: Option<f64>| {
            v.map_or(PivotCell::Undefined, |x| PivotCell::Number(round_to(x, decimals)))
        };
        match self {
            Self::Cpk => number(row.cpk),
            Self::Std => number(row.std),
            Self::Code => match row.code {
                InspectionCode::Undefined => PivotCell::Undefined,
                code => PivotCell::Text(code.label().to_owned()),
            },
            Self::Rate => match row.rate {
                SamplingRate::Undefined => PivotCell::Undefined,
                rate => PivotCell::Text(rate.label().to_owned()),
            },
            Self::TotalSn => PivotCell::Count(row.unique_unit_count),
        }
    }
}

/// A populated pivot cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PivotCell {
    Number(f64),
    Count(usize),
    Text(String),
    /// The group exists but this statistic has no value.
    Undefined,
}

impl PivotCell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }
}

/// One product type's row; `cells` is aligned with [`PivotTable::columns`]
/// and `None` marks an absent (untested) combination.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub product_type: String,
    pub cells: Vec<Option<PivotCell>>,
}

/// Wide table keyed by product type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotTable {
    pub periods: Vec<Quarter>,
    pub columns: Vec<String>,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    /// Pivots a quarterly statistics table; numeric cells are rounded to
    /// `decimals` places. Rows without a period are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use cpk_analytics::pivot::PivotTable;
    /// use cpk_analytics::report::StatisticsTable;
    ///
    /// let empty = PivotTable::build(&StatisticsTable::default(), 3);
    /// assert!(empty.rows.is_empty());
    /// assert!(empty.columns.is_empty());
    /// ```
    pub fn build(stats: &StatisticsTable, decimals: u32) -> Self {
        let periods = stats.periods();
        let columns = periods
            .iter()
            .flat_map(|&p| PivotMetric::ALL.iter().map(move |m| m.column(p)))
            .collect::<Vec<_>>();

        let mut rows: Vec<PivotRow> = Vec::new();
        for stat in &stats.rows {
            let Some(period) = stat.key.period else {
                continue;
            };
            let Ok(period_idx) = periods.binary_search(&period) else {
                continue;
            };
            // Statistics rows are sorted by product type, so a new type
            // always starts a new pivot row.
            if rows.last().map(|r| r.product_type.as_str()) != Some(stat.key.product_type.as_str()) {
                rows.push(PivotRow {
                    product_type: stat.key.product_type.clone(),
                    cells: vec![None; columns.len()],
                });
            }
            let Some(row) = rows.last_mut() else {
                continue;
            };
            let base = period_idx * PivotMetric::ALL.len();
            for (offset, metric) in PivotMetric::ALL.iter().enumerate() {
                row.cells[base + offset] = Some(metric.cell(stat, decimals));
            }
        }

        Self {
            periods,
            columns,
            rows,
        }
    }

    /// Index of a column by name.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell at (`product_type`, `column`); `None` when absent.
    pub fn cell(&self, product_type: &str, column: &str) -> Option<&PivotCell> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .find(|r| r.product_type == product_type)
            .and_then(|r| r.cells[idx].as_ref())
    }

    /// View restricted to `periods`: their column clusters only, and only
    /// the product types with at least one populated cell among them. The
    /// product type key is kept on every row.
    pub fn select_periods(&self, periods: &[Quarter]) -> Self {
        let kept: Vec<usize> = self
            .periods
            .iter()
            .enumerate()
            .filter(|(_, p)| periods.contains(*p))
            .map(|(i, _)| i)
            .collect();
        let width = PivotMetric::ALL.len();
        let column_idx: Vec<usize> = kept
            .iter()
            .flat_map(|&i| (i * width)..((i + 1) * width))
            .collect();

        let rows = self
            .rows
            .iter()
            .filter_map(|row| {
                let cells: Vec<Option<PivotCell>> =
                    column_idx.iter().map(|&c| row.cells[c].clone()).collect();
                cells.iter().any(Option::is_some).then(|| PivotRow {
                    product_type: row.product_type.clone(),
                    cells,
                })
            })
            .collect();

        Self {
            periods: kept.iter().map(|&i| self.periods[i]).collect(),
            columns: column_idx.iter().map(|&c| self.columns[c].clone()).collect(),
            rows,
        }
    }
}

struct RowView<'a> {
    columns: &'a [String],
    row: &'a PivotRow,
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("product_type", &self.row.product_type)?;
        for (column, cell) in self.columns.iter().zip(&self.row.cells) {
            if let Some(cell) = cell {
                map.serialize_entry(column, cell)?;
            }
        }
        map.end()
    }
}

impl Serialize for PivotTable {
    /// Serialized as `{ periods, columns, rows }` where each row is a flat
    /// object keyed by column name with absent cells omitted.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<RowView<'_>> = self
            .rows
            .iter()
            .map(|row| RowView {
                columns: &self.columns,
                row,
            })
            .collect();
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("periods", &self.periods)?;
        map.serialize_entry("columns", &self.columns)?;
        map.serialize_entry("rows", &rows)?;
        map.end()
    }
}
