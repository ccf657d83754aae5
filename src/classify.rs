//! Sampling-plan classification from a group's capability index.
//!
//! A capability below the threshold escalates to full inspection (`100%`,
//! rate `1:1`); at or above it, reduced sampling (`A`, rate `1:8`) applies.
//! The comparison is an explicit tri-state so an undefined index can never
//! land in either branch by accident.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::config::ClassificationMode;

/// Outcome of comparing a capability index with the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityBand {
    Below,
    AtOrAbove,
    Undefined,
}

impl CapabilityBand {
    /// Compares `cpk` against `threshold`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cpk_analytics::classify::CapabilityBand;
    ///
    /// assert_eq!(CapabilityBand::of(Some(0.94), 0.95), CapabilityBand::Below);
    /// assert_eq!(CapabilityBand::of(Some(0.95), 0.95), CapabilityBand::AtOrAbove);
    /// assert_eq!(CapabilityBand::of(None, 0.95), CapabilityBand::Undefined);
    /// ```
    pub fn of(cpk: Option<f64>, threshold: f64) -> Self {
        match cpk {
            Some(v) if v.is_nan() => Self::Undefined,
            Some(v) if v < threshold => Self::Below,
            Some(_) => Self::AtOrAbove,
            None => Self::Undefined,
        }
    }
}

/// Acceptance code shown in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InspectionCode {
    /// `100%`
    Full,
    /// `A`
    Reduced,
    Undefined,
}

/// Inspection rate shown in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingRate {
    /// `1:1`
    EveryUnit,
    /// `1:8`
    OneInEight,
    Undefined,
}

impl InspectionCode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Full => "100%",
            Self::Reduced => "A",
            Self::Undefined => "undefined",
        }
    }
}

impl SamplingRate {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EveryUnit => "1:1",
            Self::OneInEight => "1:8",
            Self::Undefined => "undefined",
        }
    }
}

impl fmt::Display for InspectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for SamplingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for InspectionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Undefined => serializer.serialize_none(),
            other => serializer.serialize_str(other.label()),
        }
    }
}

impl Serialize for SamplingRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Undefined => serializer.serialize_none(),
            other => serializer.serialize_str(other.label()),
        }
    }
}

/// Fixed-threshold classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classifier {
    threshold: f64,
    mode: ClassificationMode,
}

impl Classifier {
    pub fn new(threshold: f64, mode: ClassificationMode) -> Self {
        Self { threshold, mode }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Band for `cpk`, after applying the compatibility mode.
    pub fn band(&self, cpk: Option<f64>) -> CapabilityBand {
        match (CapabilityBand::of(cpk, self.threshold), self.mode) {
            (CapabilityBand::Undefined, ClassificationMode::Lenient) => CapabilityBand::AtOrAbove,
            (band, _) => band,
        }
    }

    /// Code and rate for `cpk`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cpk_analytics::classify::{Classifier, InspectionCode, SamplingRate};
    /// use cpk_analytics::config::ClassificationMode;
    ///
    /// let strict = Classifier::new(0.95, ClassificationMode::Strict);
    /// assert_eq!(strict.classify(Some(0.5)), (InspectionCode::Full, SamplingRate::EveryUnit));
    /// assert_eq!(strict.classify(None), (InspectionCode::Undefined, SamplingRate::Undefined));
    ///
    /// let lenient = Classifier::new(0.95, ClassificationMode::Lenient);
    /// assert_eq!(lenient.classify(None), (InspectionCode::Reduced, SamplingRate::OneInEight));
    /// ```
    pub fn classify(&self, cpk: Option<f64>) -> (InspectionCode, SamplingRate) {
        match self.band(cpk) {
            CapabilityBand::Below => (InspectionCode::Full, SamplingRate::EveryUnit),
            CapabilityBand::AtOrAbove => (InspectionCode::Reduced, SamplingRate::OneInEight),
            CapabilityBand::Undefined => (InspectionCode::Undefined, SamplingRate::Undefined),
        }
    }
}
