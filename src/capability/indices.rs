//! Process capability indices for one aggregation group (Cpu, Cpl, Cpk).
//!
//! The group's spread is the overall sample standard deviation of its first
//! readings, and its specification limits are the mean of the per-record
//! limits. Cpk is therefore what Montgomery calls Ppk; the report keeps the
//! conventional Cpk label.
//!
//! Every index is `Option<f64>`. A missing mean, a missing or zero sigma,
//! or a missing limit yields `None` rather than NaN or infinity.
//!
//! # References
//!
//! - Montgomery (2019), *Introduction to Statistical Quality Control*, 8th ed.,
//!   Chapter 8.
//! - Kane (1986), "Process Capability Indices", *Journal of Quality Technology*
//!   18(1), pp. 41--52.

use serde::Serialize;

/// Specification limits of one group.
///
/// Either side may be absent, in which case only the other one-sided index
/// is available and Cpk equals it.
///
/// # Examples
///
/// ```
/// use cpk_analytics::capability::ProcessCapability;
///
/// // LSL = 8.0, USL = 12.0, mean 9.5, sigma 0.5
/// let spec = ProcessCapability::new(Some(12.0), Some(8.0));
/// let idx = spec.indices(Some(9.5), Some(0.5));
///
/// assert!((idx.cpk_upper.unwrap() - 2.5 / 1.5).abs() < 1e-12);
/// assert!((idx.cpk_lower.unwrap() - 1.0).abs() < 1e-12);
/// assert_eq!(idx.cpk, idx.cpk_lower);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessCapability {
    usl: Option<f64>,
    lsl: Option<f64>,
}

/// Computed one-sided and combined indices.
///
/// | Index | Formula |
/// |-------|---------|
/// | `cpk_upper` | (USL − mean) / (3σ) |
/// | `cpk_lower` | (mean − LSL) / (3σ) |
/// | `cpk` | min(`cpk_upper`, `cpk_lower`) |
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CapabilityIndices {
    pub cpk_upper: Option<f64>,
    pub cpk_lower: Option<f64>,
    pub cpk: Option<f64>,
}

impl ProcessCapability {
    /// Creates a limit pair. Non-finite limits are treated as absent.
    ///
    /// Unlike a textbook specification, inverted limits (`usl <= lsl`) are
    /// accepted: averaged per-record limits are data, not configuration,
    /// and the resulting negative index is the honest answer.
    pub fn new(usl: Option<f64>, lsl: Option<f64>) -> Self {
        Self {
            usl: usl.filter(|u| u.is_finite()),
            lsl: lsl.filter(|l| l.is_finite()),
        }
    }

    pub fn usl(&self) -> Option<f64> {
        self.usl
    }

    pub fn lsl(&self) -> Option<f64> {
        self.lsl
    }

    /// Computes the indices from a group mean and sample sigma.
    ///
    /// Returns all-`None` indices when `mean` is missing or when `sigma` is
    /// missing, zero, negative or non-finite. A zero-spread group has no
    /// finite capability under this formula and must not report infinity.
    pub fn indices(&self, mean: Option<f64>, sigma: Option<f64>) -> CapabilityIndices {
        let (Some(x_bar), Some(sigma)) = (
            mean.filter(|m| m.is_finite()),
            sigma.filter(|s| s.is_finite() && *s > 0.0),
        ) else {
            return CapabilityIndices::default();
        };

        let cpk_upper = self.usl.map(|u| (u - x_bar) / (3.0 * sigma));
        let cpk_lower = self.lsl.map(|l| (x_bar - l) / (3.0 * sigma));
        let cpk = match (cpk_upper, cpk_lower) {
            (Some(u), Some(l)) => Some(u.min(l)),
            (Some(u), None) => Some(u),
            (None, Some(l)) => Some(l),
            (None, None) => None,
        };

        CapabilityIndices {
            cpk_upper,
            cpk_lower,
            cpk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Two-sided
    // -----------------------------------------------------------------------

    /// Off-center process: mean shifted toward USL.
    ///
    /// LSL = 200, USL = 220, mean = 215, sigma = 2.0
    /// Cpu = (220 - 215) / 6 = 0.8333
    /// Cpl = (215 - 200) / 6 = 2.5
    #[test]
    fn off_center_process() {
        let idx = ProcessCapability::new(Some(220.0), Some(200.0)).indices(Some(215.0), Some(2.0));
        let cpu = idx.cpk_upper.unwrap();
        let cpl = idx.cpk_lower.unwrap();
        assert!((cpu - 5.0 / 6.0).abs() < 1e-12, "cpu = {cpu}");
        assert!((cpl - 2.5).abs() < 1e-12, "cpl = {cpl}");
        assert_eq!(idx.cpk, Some(cpu));
    }

    #[test]
    fn mean_outside_limits_is_negative() {
        let idx = ProcessCapability::new(Some(10.0), Some(0.0)).indices(Some(11.0), Some(1.0));
        assert!(idx.cpk.unwrap() < 0.0);
    }

    // -----------------------------------------------------------------------
    // One-sided
    // -----------------------------------------------------------------------

    #[test]
    fn usl_only() {
        let idx = ProcessCapability::new(Some(10.0), None).indices(Some(7.0), Some(1.0));
        assert_eq!(idx.cpk_upper, Some(1.0));
        assert!(idx.cpk_lower.is_none());
        assert_eq!(idx.cpk, Some(1.0));
    }

    #[test]
    fn lsl_only() {
        let idx = ProcessCapability::new(None, Some(4.0)).indices(Some(7.0), Some(1.0));
        assert!(idx.cpk_upper.is_none());
        assert_eq!(idx.cpk, Some(1.0));
    }

    #[test]
    fn no_limits_no_index() {
        let idx = ProcessCapability::new(None, Some(f64::NAN)).indices(Some(7.0), Some(1.0));
        assert_eq!(idx, CapabilityIndices::default());
    }

    // -----------------------------------------------------------------------
    // Undefined sigma / mean
    // -----------------------------------------------------------------------

    #[test]
    fn zero_sigma_is_undefined_not_infinite() {
        let spec = ProcessCapability::new(Some(12.0), Some(8.0));
        assert_eq!(spec.indices(Some(10.0), Some(0.0)), CapabilityIndices::default());
    }

    #[test]
    fn invalid_sigma_is_undefined() {
        let spec = ProcessCapability::new(Some(12.0), Some(8.0));
        for sigma in [None, Some(-1.0), Some(f64::NAN), Some(f64::INFINITY)] {
            assert_eq!(spec.indices(Some(10.0), sigma), CapabilityIndices::default());
        }
    }

    #[test]
    fn missing_mean_is_undefined() {
        let spec = ProcessCapability::new(Some(12.0), Some(8.0));
        assert_eq!(spec.indices(None, Some(1.0)), CapabilityIndices::default());
    }
}
