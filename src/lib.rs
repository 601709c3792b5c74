//! Sightline - in-process stats aggregation with tag-scoped views.
//!
//! Sightline folds numeric measurements into named, columnar views. A view
//! names the measure it watches, the aggregation it applies (sum, count,
//! mean or distribution), the tag keys it groups by and its time window.
//! Producers record measurements against a tag context; the registry fans
//! each observation out to every matching view and serves consistent
//! point-in-time snapshots to exporters.
//!
//! # Features
//!
//! - **Columnar views**: group aggregates by any subset of tag dimensions
//! - **Consistent snapshots**: exporters never observe a half-applied fold
//! - **Pluggable backend**: full in-memory collection or a no-op stand-in,
//!   selected by constructor injection with the no-op as default
//! - **Periodic export**: a driver that snapshots every exported view on a
//!   fixed interval and hands the batch to any [`export::StatsExporter`]
//!
//! # Example
//!
//! ```
//! use sightline::core::Config;
//! use sightline::stats::{
//!     Aggregation, AggregationWindow, Measure, MeasurementBatch, Stats, View, ViewName,
//! };
//! use sightline::tags::{TagContext, TagKey, TagValue};
//!
//! fn main() -> sightline::core::Result<()> {
//!     let stats = Stats::in_memory(&Config::default());
//!
//!     let latency = Measure::f64("rpc/latency", "request latency", "ms")?;
//!     let method = TagKey::new("method")?;
//!     let view = View::new(
//!         ViewName::new("rpc/latency/sum")?,
//!         "total latency by method",
//!         latency.clone(),
//!         Aggregation::Sum,
//!         vec![method.clone()],
//!         AggregationWindow::Cumulative,
//!     )?;
//!     stats.register_view(view)?;
//!
//!     let ctx = TagContext::builder()
//!         .put(method, TagValue::new("GET")?)
//!         .build();
//!     stats.record(&ctx, MeasurementBatch::new().put_f64(&latency, 5.0))?;
//!
//!     let data = stats.view_data(&ViewName::new("rpc/latency/sum")?)?;
//!     assert!(data.is_some());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod core;
pub mod export;
pub mod stats;
pub mod tags;

// Re-export core types for convenience
pub use crate::core::{Config, Result, SightlineError};
pub use crate::stats::Stats;
