//! Running accumulator state, one shape per aggregation kind.

use crate::stats::aggregation::{Aggregation, BucketBoundaries};
use crate::stats::measure::{MeasureKind, MeasureValue};

/// The live running result of an [`Aggregation`].
///
/// An accumulator is structurally bound to one aggregation kind and, for
/// sums, to the measure's numeric kind. The registry creates accumulators
/// through [`AggregationData::empty`] so the pairing can never drift;
/// snapshot construction re-checks it with
/// [`AggregationData::matches`].
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationData {
    /// Running total of a floating-point measure.
    SumF64(f64),
    /// Running total of an integer measure.
    SumI64(i64),
    /// Number of recorded values.
    Count(u64),
    /// Running sum and count; the mean is their quotient.
    Mean {
        /// Sum of recorded values.
        sum: f64,
        /// Number of recorded values.
        count: u64,
    },
    /// Histogram bucket counts plus running distribution statistics.
    Distribution(DistributionData),
}

impl AggregationData {
    /// Creates the zero accumulator for an aggregation over a measure of
    /// the given kind.
    pub fn empty(aggregation: &Aggregation, kind: MeasureKind) -> Self {
        match aggregation {
            Aggregation::Sum => match kind {
                MeasureKind::F64 => AggregationData::SumF64(0.0),
                MeasureKind::I64 => AggregationData::SumI64(0),
            },
            Aggregation::Count => AggregationData::Count(0),
            Aggregation::Mean => AggregationData::Mean { sum: 0.0, count: 0 },
            Aggregation::Distribution(bounds) => {
                AggregationData::Distribution(DistributionData::empty(bounds.clone()))
            }
        }
    }

    /// Folds a single observation into the accumulator.
    ///
    /// Value kind is checked at the recording boundary; by the time a value
    /// reaches an accumulator it matches the measure the accumulator was
    /// created for.
    pub fn add(&mut self, value: MeasureValue) {
        match self {
            AggregationData::SumF64(total) => *total += value.as_f64(),
            AggregationData::SumI64(total) => *total += value.as_i64(),
            AggregationData::Count(n) => *n += 1,
            AggregationData::Mean { sum, count } => {
                *sum += value.as_f64();
                *count += 1;
            }
            AggregationData::Distribution(dist) => dist.add(value.as_f64()),
        }
    }

    /// Returns true if this accumulator shape matches the aggregation and
    /// measure kind.
    pub fn matches(&self, aggregation: &Aggregation, kind: MeasureKind) -> bool {
        match (self, aggregation) {
            (AggregationData::SumF64(_), Aggregation::Sum) => kind == MeasureKind::F64,
            (AggregationData::SumI64(_), Aggregation::Sum) => kind == MeasureKind::I64,
            (AggregationData::Count(_), Aggregation::Count) => true,
            (AggregationData::Mean { .. }, Aggregation::Mean) => true,
            (AggregationData::Distribution(dist), Aggregation::Distribution(bounds)) => {
                dist.boundaries() == bounds
            }
            _ => false,
        }
    }

    /// Returns a short name for the accumulator shape.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AggregationData::SumF64(_) => "sum_f64",
            AggregationData::SumI64(_) => "sum_i64",
            AggregationData::Count(_) => "count",
            AggregationData::Mean { .. } => "mean",
            AggregationData::Distribution(_) => "distribution",
        }
    }

    /// Returns the number of folded observations, where the shape tracks it.
    pub fn count(&self) -> Option<u64> {
        match self {
            AggregationData::Count(n) => Some(*n),
            AggregationData::Mean { count, .. } => Some(*count),
            AggregationData::Distribution(dist) => Some(dist.count()),
            AggregationData::SumF64(_) | AggregationData::SumI64(_) => None,
        }
    }
}

/// Histogram state: bucket counts plus incrementally maintained mean,
/// sum of squared deviations, min and max.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionData {
    boundaries: BucketBoundaries,
    bucket_counts: Vec<u64>,
    count: u64,
    mean: f64,
    sum_of_squared_deviation: f64,
    min: f64,
    max: f64,
}

impl DistributionData {
    fn empty(boundaries: BucketBoundaries) -> Self {
        let buckets = boundaries.bucket_count();
        DistributionData {
            boundaries,
            bucket_counts: vec![0; buckets],
            count: 0,
            mean: 0.0,
            sum_of_squared_deviation: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Folds one observation into the histogram.
    ///
    /// Mean and squared deviation use the incremental Welford update, which
    /// avoids the catastrophic cancellation of the naive sum-of-squares
    /// formula.
    fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.sum_of_squared_deviation += delta * (value - self.mean);

        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }

        let index = self.boundaries.bucket_index(value);
        self.bucket_counts[index] += 1;
    }

    /// Returns the bucket boundaries.
    pub fn boundaries(&self) -> &BucketBoundaries {
        &self.boundaries
    }

    /// Returns the per-bucket counts.
    pub fn bucket_counts(&self) -> &[u64] {
        &self.bucket_counts
    }

    /// Returns the number of folded observations.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the running mean, 0 when empty.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Returns the running sum of squared deviations from the mean.
    pub fn sum_of_squared_deviation(&self) -> f64 {
        self.sum_of_squared_deviation
    }

    /// Returns the smallest folded value, +inf when empty.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Returns the largest folded value, -inf when empty.
    pub fn max(&self) -> f64 {
        self.max
    }
}
