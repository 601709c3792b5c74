//! Fold strategies: how a stream of observations collapses into one
//! aggregate.

use crate::core::{Result, SightlineError};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Ordered histogram bucket boundaries.
///
/// Boundaries must be finite, non-negative and strictly increasing. `n` boundaries
/// define `n + 1` buckets; a boundary is the inclusive lower bound of the
/// bucket above it, so a value exactly equal to a boundary lands in the
/// higher bucket.
#[derive(Debug, Clone)]
pub struct BucketBoundaries {
    bounds: Vec<f64>,
}

impl BucketBoundaries {
    /// Creates bucket boundaries after validation.
    pub fn new(bounds: Vec<f64>) -> Result<Self> {
        if bounds.is_empty() {
            return Err(SightlineError::invalid_buckets(
                "bucket boundaries cannot be empty",
            ));
        }
        let mut prev = f64::NEG_INFINITY;
        for &bound in &bounds {
            if !bound.is_finite() {
                return Err(SightlineError::invalid_buckets(format!(
                    "bucket boundary must be finite, got {}",
                    bound
                )));
            }
            if bound < 0.0 {
                return Err(SightlineError::invalid_buckets(format!(
                    "bucket boundary cannot be negative, got {}",
                    bound
                )));
            }
            if bound <= prev {
                return Err(SightlineError::invalid_buckets(format!(
                    "bucket boundaries must be strictly increasing, got {} after {}",
                    bound, prev
                )));
            }
            prev = bound;
        }
        Ok(BucketBoundaries { bounds })
    }

    /// Returns the boundary values.
    pub fn as_slice(&self) -> &[f64] {
        &self.bounds
    }

    /// Returns the number of buckets, one more than the boundary count.
    pub fn bucket_count(&self) -> usize {
        self.bounds.len() + 1
    }

    /// Returns the bucket index for a value: the first boundary exceeding
    /// the value, with the final bucket catching everything beyond the last
    /// boundary.
    pub fn bucket_index(&self, value: f64) -> usize {
        self.bounds
            .iter()
            .position(|&bound| value < bound)
            .unwrap_or(self.bounds.len())
    }
}

// Bit-level float comparison so views stay hashable. NaN boundaries cannot
// be constructed (NaN fails the ordering check in `new`).
impl PartialEq for BucketBoundaries {
    fn eq(&self, other: &Self) -> bool {
        self.bounds.len() == other.bounds.len()
            && self
                .bounds
                .iter()
                .zip(&other.bounds)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for BucketBoundaries {}

impl Hash for BucketBoundaries {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for bound in &self.bounds {
            bound.to_bits().hash(state);
        }
    }
}

/// The fold strategy a view applies to its measure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// Running total of recorded values.
    Sum,
    /// Number of recorded values, ignoring the values themselves.
    Count,
    /// Running arithmetic mean.
    Mean,
    /// Histogram with the given bucket boundaries plus running count, mean,
    /// sum of squared deviations, min and max.
    Distribution(BucketBoundaries),
}

impl Aggregation {
    /// Returns a short name for the aggregation kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::Mean => "mean",
            Aggregation::Distribution(_) => "distribution",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_validation() {
        assert!(BucketBoundaries::new(vec![1.0, 5.0, 10.0]).is_ok());
        assert!(BucketBoundaries::new(vec![]).is_err());
        assert!(BucketBoundaries::new(vec![-1.0, 5.0]).is_err());
        assert!(BucketBoundaries::new(vec![1.0, 1.0]).is_err());
        assert!(BucketBoundaries::new(vec![5.0, 1.0]).is_err());
        assert!(BucketBoundaries::new(vec![1.0, f64::NAN]).is_err());
        assert!(BucketBoundaries::new(vec![1.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_bucket_index() {
        let bounds = BucketBoundaries::new(vec![1.0, 5.0, 10.0]).unwrap();
        assert_eq!(bounds.bucket_count(), 4);

        assert_eq!(bounds.bucket_index(0.5), 0);
        assert_eq!(bounds.bucket_index(3.0), 1);
        assert_eq!(bounds.bucket_index(7.5), 2);
        assert_eq!(bounds.bucket_index(50.0), 3);
    }

    #[test]
    fn test_bucket_index_on_boundary() {
        // A value equal to a boundary belongs to the bucket above it.
        let bounds = BucketBoundaries::new(vec![1.0, 5.0]).unwrap();
        assert_eq!(bounds.bucket_index(1.0), 1);
        assert_eq!(bounds.bucket_index(5.0), 2);
        assert_eq!(bounds.bucket_index(0.0), 0);
    }

    #[test]
    fn test_boundaries_equality() {
        let a = BucketBoundaries::new(vec![1.0, 2.0]).unwrap();
        let b = BucketBoundaries::new(vec![1.0, 2.0]).unwrap();
        let c = BucketBoundaries::new(vec![1.0, 3.0]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
