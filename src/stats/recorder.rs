//! The producer-facing recording surface.

use crate::core::{Result, SightlineError};
use crate::stats::measure::{Measure, MeasureValue};
use crate::stats::registry::ViewRegistry;
use crate::tags::TagContext;
use std::sync::Arc;

/// A batch of measurements recorded against one tag context.
///
/// A later put for the same measure replaces the earlier one; the batch
/// holds at most one value per measure.
#[derive(Debug, Default)]
pub struct MeasurementBatch {
    entries: Vec<(Measure, MeasureValue)>,
}

impl MeasurementBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a floating-point measurement, replacing any earlier value for
    /// the same measure. Kind mismatches surface when the batch is
    /// recorded.
    pub fn put_f64(self, measure: &Measure, value: f64) -> Self {
        self.put(measure, MeasureValue::F64(value))
    }

    /// Adds an integer measurement, replacing any earlier value for the
    /// same measure. Kind mismatches surface when the batch is recorded.
    pub fn put_i64(self, measure: &Measure, value: i64) -> Self {
        self.put(measure, MeasureValue::I64(value))
    }

    fn put(mut self, measure: &Measure, value: MeasureValue) -> Self {
        match self.entries.iter_mut().find(|(m, _)| m == measure) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((measure.clone(), value)),
        }
        self
    }

    /// Returns the number of distinct measures in the batch.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been put.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validates that every entry matches its measure's numeric kind.
    fn check_kinds(&self) -> Result<()> {
        for (measure, value) in &self.entries {
            if !value.matches(measure) {
                return Err(SightlineError::MeasureKindMismatch {
                    measure: measure.name().to_string(),
                    expected: measure.kind().as_str(),
                });
            }
        }
        Ok(())
    }
}

/// Records measurement batches against the ambient tag context.
pub trait StatsRecorder: Send + Sync {
    /// Folds every measurement in the batch into the matching views.
    ///
    /// The whole batch is kind-checked before any value is folded, so a
    /// malformed batch leaves accumulators untouched.
    fn record(&self, context: &TagContext, batch: MeasurementBatch) -> Result<()>;
}

/// Recorder backed by a live view registry.
pub struct RegistryRecorder {
    registry: Arc<ViewRegistry>,
}

impl RegistryRecorder {
    /// Creates a recorder writing into the given registry.
    pub fn new(registry: Arc<ViewRegistry>) -> Self {
        RegistryRecorder { registry }
    }
}

impl StatsRecorder for RegistryRecorder {
    fn record(&self, context: &TagContext, batch: MeasurementBatch) -> Result<()> {
        batch.check_kinds()?;
        for (measure, value) in batch.entries {
            self.registry.record(context, &measure, value)?;
        }
        Ok(())
    }
}

/// Recorder that drops every measurement.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatsRecorder;

impl StatsRecorder for NoopStatsRecorder {
    fn record(&self, _context: &TagContext, _batch: MeasurementBatch) -> Result<()> {
        Ok(())
    }
}
