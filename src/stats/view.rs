//! View definitions and immutable snapshots of their aggregated data.

use crate::core::{Result, SightlineError};
use crate::stats::aggregation::Aggregation;
use crate::stats::data::AggregationData;
use crate::stats::measure::Measure;
use crate::tags::{TagKey, TagValue};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, SystemTime};

/// Maximum byte length for view names.
pub const MAX_VIEW_NAME_LENGTH: usize = 255;

/// A validated, unique view name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewName(String);

impl ViewName {
    /// Creates a new ViewName after validation.
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(SightlineError::invalid_name("View name cannot be empty"));
        }
        if name.len() > MAX_VIEW_NAME_LENGTH {
            return Err(SightlineError::invalid_name(format!(
                "View name cannot exceed {} bytes, got {}",
                MAX_VIEW_NAME_LENGTH,
                name.len()
            )));
        }
        if !name.bytes().all(|b| (32..=126).contains(&b)) {
            return Err(SightlineError::invalid_name(
                "View name must be printable ASCII",
            ));
        }
        Ok(ViewName(name))
    }

    /// Returns the string representation of the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the inner string value.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The aggregation horizon of a view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggregationWindow {
    /// Unbounded: aggregates from registration (or the last collection
    /// resume) until cleared. Only cumulative views are exported.
    Cumulative,
    /// A fixed trailing duration ending now. Interval views are not part of
    /// the general export path.
    Interval(Duration),
}

/// A named specification of what to aggregate: which measure, which fold
/// strategy, which tag columns, which time window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct View {
    name: ViewName,
    description: String,
    measure: Measure,
    aggregation: Aggregation,
    columns: Vec<TagKey>,
    window: AggregationWindow,
}

impl View {
    /// Creates a new view after validation.
    ///
    /// Columns must be duplicate-free; an interval window must have a
    /// positive duration.
    pub fn new(
        name: ViewName,
        description: impl Into<String>,
        measure: Measure,
        aggregation: Aggregation,
        columns: Vec<TagKey>,
        window: AggregationWindow,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column) {
                return Err(SightlineError::invalid_view(format!(
                    "duplicate column {} in view {}",
                    column, name
                )));
            }
        }
        if let AggregationWindow::Interval(duration) = &window {
            if duration.is_zero() {
                return Err(SightlineError::invalid_view(format!(
                    "interval window for view {} must have a positive duration",
                    name
                )));
            }
        }
        Ok(View {
            name,
            description: description.into(),
            measure,
            aggregation,
            columns,
            window,
        })
    }

    /// Returns the unique name of the view.
    pub fn name(&self) -> &ViewName {
        &self.name
    }

    /// Returns the human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the measure this view watches.
    pub fn measure(&self) -> &Measure {
        &self.measure
    }

    /// Returns the fold strategy this view applies.
    pub fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }

    /// Returns the ordered tag keys this view groups by.
    pub fn columns(&self) -> &[TagKey] {
        &self.columns
    }

    /// Returns the aggregation window.
    pub fn window(&self) -> &AggregationWindow {
        &self.window
    }
}

/// One snapshot row key: tag values in column order, `None` marking a
/// dimension that was absent from the recorded context.
pub type TagValues = SmallVec<[Option<TagValue>; 4]>;

/// Window bookkeeping attached to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowData {
    /// Aggregation since registration or the last collection resume.
    Cumulative {
        /// Start of the aggregation run.
        start: SystemTime,
        /// Snapshot time.
        end: SystemTime,
    },
    /// Trailing fixed-duration window ending at the snapshot time.
    Interval {
        /// Snapshot time.
        end: SystemTime,
        /// Length of the trailing window.
        duration: Duration,
    },
}

impl WindowData {
    fn matches(&self, window: &AggregationWindow) -> bool {
        matches!(
            (self, window),
            (WindowData::Cumulative { .. }, AggregationWindow::Cumulative)
                | (WindowData::Interval { .. }, AggregationWindow::Interval(_))
        )
    }
}

/// An immutable snapshot of a view's aggregation map and window.
///
/// A snapshot is a defensive copy: folds applied after it was taken never
/// change it.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewData {
    view: View,
    window: WindowData,
    rows: HashMap<TagValues, AggregationData>,
}

impl ViewData {
    /// Creates a snapshot after validating that every row structurally
    /// matches the view: tuple arity equals the column count, and each
    /// accumulator matches the view's aggregation and measure kind.
    pub fn new(
        view: View,
        window: WindowData,
        rows: HashMap<TagValues, AggregationData>,
    ) -> Result<Self> {
        if !window.matches(view.window()) {
            return Err(SightlineError::invalid_view(format!(
                "window data kind does not match the window of view {}",
                view.name()
            )));
        }
        for (tag_values, data) in &rows {
            if tag_values.len() != view.columns().len() {
                return Err(SightlineError::invalid_view(format!(
                    "row arity {} does not match {} columns of view {}",
                    tag_values.len(),
                    view.columns().len(),
                    view.name()
                )));
            }
            if !data.matches(view.aggregation(), view.measure().kind()) {
                return Err(SightlineError::AggregationMismatch {
                    view: view.name().to_string(),
                    expected: view.aggregation().kind_name().to_string(),
                    found: data.kind_name().to_string(),
                });
            }
        }
        Ok(ViewData { view, window, rows })
    }

    /// Returns the view this snapshot belongs to.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Returns the window bookkeeping for this snapshot.
    pub fn window(&self) -> &WindowData {
        &self.window
    }

    /// Returns the aggregation rows keyed by tag-value tuple.
    pub fn rows(&self) -> &HashMap<TagValues, AggregationData> {
        &self.rows
    }

    /// Returns the accumulator for one tag-value tuple, if present.
    pub fn row(&self, tag_values: &TagValues) -> Option<&AggregationData> {
        self.rows.get(tag_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::measure::MeasureKind;
    use smallvec::smallvec;
    use std::time::UNIX_EPOCH;

    fn latency_measure() -> Measure {
        Measure::f64("rpc/latency", "request latency", "ms").unwrap()
    }

    fn cumulative_view(name: &str, columns: Vec<TagKey>) -> View {
        View::new(
            ViewName::new(name).unwrap(),
            "latency sum",
            latency_measure(),
            Aggregation::Sum,
            columns,
            AggregationWindow::Cumulative,
        )
        .unwrap()
    }

    fn epoch_window() -> WindowData {
        WindowData::Cumulative {
            start: UNIX_EPOCH,
            end: UNIX_EPOCH,
        }
    }

    #[test]
    fn test_view_name_validation() {
        assert!(ViewName::new("rpc/latency/sum").is_ok());
        assert!(ViewName::new("").is_err());
        assert!(ViewName::new("a".repeat(256)).is_err());
    }

    #[test]
    fn test_view_rejects_duplicate_columns() {
        let key = TagKey::new("method").unwrap();
        let result = View::new(
            ViewName::new("v").unwrap(),
            "desc",
            latency_measure(),
            Aggregation::Sum,
            vec![key.clone(), key],
            AggregationWindow::Cumulative,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_view_rejects_zero_interval() {
        let result = View::new(
            ViewName::new("v").unwrap(),
            "desc",
            latency_measure(),
            Aggregation::Sum,
            vec![],
            AggregationWindow::Interval(Duration::ZERO),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_view_structural_equality() {
        let key = TagKey::new("method").unwrap();
        let a = cumulative_view("v", vec![key.clone()]);
        let b = cumulative_view("v", vec![key]);
        let c = cumulative_view("v", vec![]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_view_data_validates_row_arity() {
        let key = TagKey::new("method").unwrap();
        let view = cumulative_view("v", vec![key]);

        let mut rows = HashMap::new();
        let tuple: TagValues = smallvec![None, None];
        rows.insert(tuple, AggregationData::SumF64(1.0));

        assert!(ViewData::new(view, epoch_window(), rows).is_err());
    }

    #[test]
    fn test_view_data_rejects_mismatched_accumulator() {
        let view = cumulative_view("v", vec![]);

        // An i64 sum accumulator under an f64 sum view.
        let mut rows = HashMap::new();
        let tuple: TagValues = smallvec![];
        rows.insert(tuple, AggregationData::SumI64(1));

        let err = ViewData::new(view, epoch_window(), rows).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_view_data_rejects_mismatched_window() {
        let view = cumulative_view("v", vec![]);
        let window = WindowData::Interval {
            end: UNIX_EPOCH,
            duration: Duration::from_secs(10),
        };
        assert!(ViewData::new(view, window, HashMap::new()).is_err());
    }

    #[test]
    fn test_view_data_accessors() {
        let view = cumulative_view("v", vec![]);
        let mut rows = HashMap::new();
        let tuple: TagValues = smallvec![];
        rows.insert(tuple.clone(), AggregationData::SumF64(8.0));

        let data = ViewData::new(view, epoch_window(), rows).unwrap();
        assert_eq!(data.row(&tuple), Some(&AggregationData::SumF64(8.0)));
        assert_eq!(data.rows().len(), 1);
        assert_eq!(
            data.view().measure().kind(),
            MeasureKind::F64
        );
    }
}
