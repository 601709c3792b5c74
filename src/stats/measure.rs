//! Measurement identity: what is being observed, independent of how it is
//! aggregated.

use crate::core::{Result, SightlineError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Maximum byte length for measure names and units.
pub const MAX_MEASURE_LENGTH: usize = 255;

/// The numeric kind a measure records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureKind {
    /// Floating-point measurements (latencies, ratios).
    F64,
    /// Integer measurements (byte counts, item counts).
    I64,
}

impl MeasureKind {
    /// Returns a short human-readable name for the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureKind::F64 => "f64",
            MeasureKind::I64 => "i64",
        }
    }
}

/// The quantity being observed.
///
/// A measure's identity is its unique name: two measures with the same name
/// compare equal regardless of description or unit. Create measures once at
/// static-registration time and share them.
#[derive(Debug, Clone)]
pub struct Measure {
    name: String,
    description: String,
    unit: String,
    kind: MeasureKind,
}

impl Measure {
    /// Creates a floating-point measure after validation.
    pub fn f64(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> Result<Self> {
        Self::create(name.into(), description.into(), unit.into(), MeasureKind::F64)
    }

    /// Creates an integer measure after validation.
    pub fn i64(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> Result<Self> {
        Self::create(name.into(), description.into(), unit.into(), MeasureKind::I64)
    }

    fn create(name: String, description: String, unit: String, kind: MeasureKind) -> Result<Self> {
        if name.is_empty() {
            return Err(SightlineError::invalid_measure("Measure name cannot be empty"));
        }
        if name.len() > MAX_MEASURE_LENGTH {
            return Err(SightlineError::invalid_measure(format!(
                "Measure name cannot exceed {} bytes, got {}",
                MAX_MEASURE_LENGTH,
                name.len()
            )));
        }
        if !name.bytes().all(|b| (32..=126).contains(&b)) {
            return Err(SightlineError::invalid_measure(
                "Measure name must be printable ASCII",
            ));
        }
        if unit.len() > MAX_MEASURE_LENGTH {
            return Err(SightlineError::invalid_measure(format!(
                "Measure unit cannot exceed {} bytes, got {}",
                MAX_MEASURE_LENGTH,
                unit.len()
            )));
        }
        Ok(Measure {
            name,
            description,
            unit,
            kind,
        })
    }

    /// Returns the unique name of the measure.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the unit of measurement, e.g. `"ms"` or `"By"`.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Returns the numeric kind of the measure.
    pub fn kind(&self) -> MeasureKind {
        self.kind
    }
}

// Identity is the unique name.
impl PartialEq for Measure {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Measure {}

impl Hash for Measure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.unit)
    }
}

/// A single recorded value, tagged with its numeric kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureValue {
    /// A floating-point observation.
    F64(f64),
    /// An integer observation.
    I64(i64),
}

impl MeasureValue {
    /// Returns the kind of this value.
    pub fn kind(&self) -> MeasureKind {
        match self {
            MeasureValue::F64(_) => MeasureKind::F64,
            MeasureValue::I64(_) => MeasureKind::I64,
        }
    }

    /// Returns true if this value can be recorded against the given measure.
    pub fn matches(&self, measure: &Measure) -> bool {
        self.kind() == measure.kind()
    }

    /// Returns the value as a float.
    pub fn as_f64(&self) -> f64 {
        match self {
            MeasureValue::F64(v) => *v,
            MeasureValue::I64(v) => *v as f64,
        }
    }

    /// Returns the value as an integer, truncating floats.
    ///
    /// Only called for accumulators that were created for an integer
    /// measure, so truncation never loses data on the checked record path.
    pub fn as_i64(&self) -> i64 {
        match self {
            MeasureValue::F64(v) => *v as i64,
            MeasureValue::I64(v) => *v,
        }
    }
}

impl From<f64> for MeasureValue {
    fn from(v: f64) -> Self {
        MeasureValue::F64(v)
    }
}

impl From<i64> for MeasureValue {
    fn from(v: i64) -> Self {
        MeasureValue::I64(v)
    }
}
