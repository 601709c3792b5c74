//! Tag-scoped stats collection: measures, aggregations, views and the
//! registry that folds measurements into per-view accumulator maps.

pub mod aggregation;
pub mod component;
pub mod data;
pub mod measure;
pub mod recorder;
pub mod registry;
pub mod state;
pub mod view;

pub use aggregation::{Aggregation, BucketBoundaries};
pub use component::{
    InMemoryStats, NoopStats, NoopViewManager, Stats, StatsComponent, ViewManager,
};
pub use data::{AggregationData, DistributionData};
pub use measure::{Measure, MeasureKind, MeasureValue};
pub use recorder::{MeasurementBatch, NoopStatsRecorder, RegistryRecorder, StatsRecorder};
pub use registry::ViewRegistry;
pub use state::{CollectionState, CurrentState};
pub use view::{AggregationWindow, TagValues, View, ViewData, ViewName, WindowData};
