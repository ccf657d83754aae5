//! # cpk-analytics
//!
//! Process capability (Cpk) aggregation over repeated quality-control
//! measurements, grouped by product type and optionally calendar quarter.
//!
//! Units are often tested more than once. Capability is computed from each
//! unit's *first* reading per group, while test volume counts every
//! reading. Quarterly results can be pivoted into one row per product type
//! for trend charting.
//!
//! ## Pipeline
//!
//! 1. [`normalize`]: raw string table to typed [`record::MeasurementRecord`]s
//! 2. [`dedup`]: earliest reading per unit per group
//! 3. [`statistics`] + [`capability`]: mean, sample σ, averaged limits, Cpu/Cpl/Cpk
//! 4. [`volume`]: total tests and unique units per group
//! 5. [`classify`]: inspection code and sampling rate from Cpk
//! 6. [`pivot`]: wide quarterly table
//!
//! [`engine::CapabilityEngine`] runs all of it and returns a
//! [`report::CapabilityReport`].
//!
//! ## Design Philosophy
//!
//! - **No sentinels**: an undefined statistic is `None` all the way to the
//!   report, never NaN, infinity, or a default classification
//! - **Explicit inputs**: column roles and policies are immutable values
//!   resolved once at the boundary
//! - **Pure batch**: every run recomputes from the input; no shared state

pub mod capability;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod pivot;
pub mod record;
pub mod report;
pub mod statistics;
pub mod table;
pub mod volume;

pub use config::{ColumnRoles, EngineConfig};
pub use engine::CapabilityEngine;
pub use error::{CpkError, Result};
pub use report::CapabilityReport;
pub use table::RawTable;
