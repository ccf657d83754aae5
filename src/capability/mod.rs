//! Process capability analysis.
//!
//! Computes the one-sided and combined capability indices for an
//! aggregation group from its mean, sample sigma and averaged limits.
//!
//! # Indices
//!
//! - **Cpu** (`cpk_upper`): distance to the upper limit in units of 3σ
//! - **Cpl** (`cpk_lower`): distance to the lower limit in units of 3σ
//! - **Cpk**: the smaller of the two
//!
//! # References
//!
//! - Montgomery (2019), *Introduction to Statistical Quality Control*, 8th ed.

mod indices;

pub use indices::{CapabilityIndices, ProcessCapability};
