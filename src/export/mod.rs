//! Periodic export of view snapshots.
//!
//! Exporters receive immutable [`ViewData`] batches and translate them into
//! backend-specific payloads. Transport failures are the exporter's own
//! retryable concern; the registry never observes them. The bundled
//! [`JsonExporter`] renders snapshots as JSON lines and doubles as a debug
//! dump.

use crate::core::config::ExportConfig;
use crate::core::Result;
use crate::stats::component::Stats;
use crate::stats::data::AggregationData;
use crate::stats::view::{ViewData, WindowData};
use parking_lot::Mutex;
use serde_json::{json, Number, Value};
use std::io::Write;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Translates view snapshots into a backend-specific payload.
pub trait StatsExporter: Send + Sync {
    /// Exports one batch of snapshots.
    fn export(&self, batch: Vec<ViewData>) -> Result<()>;

    /// Returns the exporter name used in logs.
    fn name(&self) -> &str;
}

/// Collects every exported view's snapshot and hands the batch to an
/// exporter on a fixed interval.
pub struct ExportDriver {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ExportDriver {
    /// Spawns the driver on the current tokio runtime.
    pub fn spawn(stats: Stats, exporter: Arc<dyn StatsExporter>, config: &ExportConfig) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let interval = config.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => export_once(&stats, exporter.as_ref()),
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            // Final snapshot so data recorded since the last tick is not
            // lost on shutdown.
            export_once(&stats, exporter.as_ref());
        });
        ExportDriver { shutdown, handle }
    }

    /// Stops the driver after one final export pass.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

/// Runs a single export pass: snapshot every exported view, hand the batch
/// to the exporter. Snapshot and export failures are logged, never
/// propagated back to the registry.
pub fn export_once(stats: &Stats, exporter: &dyn StatsExporter) {
    let views = stats.exported_views();
    let mut batch = Vec::with_capacity(views.len());
    for view in views.iter() {
        match stats.view_data(view.name()) {
            Ok(Some(data)) => batch.push(data),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(view = %view.name(), error = %e, "failed to snapshot view")
            }
        }
    }
    if batch.is_empty() {
        return;
    }
    tracing::debug!(exporter = exporter.name(), views = batch.len(), "exporting snapshots");
    if let Err(e) = exporter.export(batch) {
        tracing::error!(exporter = exporter.name(), error = %e, "export failed");
    }
}

/// Renders each snapshot as one JSON line.
pub struct JsonExporter {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonExporter {
    /// Creates an exporter writing to the given sink.
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        JsonExporter {
            writer: Mutex::new(writer),
        }
    }

    /// Creates an exporter writing to stdout.
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

impl StatsExporter for JsonExporter {
    fn export(&self, batch: Vec<ViewData>) -> Result<()> {
        let mut writer = self.writer.lock();
        for data in &batch {
            serde_json::to_writer(&mut *writer, &view_data_to_json(data))?;
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "json"
    }
}

fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// Infinities (empty distribution min/max) have no JSON number form and
// render as null.
fn num(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

fn window_to_json(window: &WindowData) -> Value {
    match window {
        WindowData::Cumulative { start, end } => json!({
            "type": "cumulative",
            "start_ms": millis_since_epoch(*start),
            "end_ms": millis_since_epoch(*end),
        }),
        WindowData::Interval { end, duration } => json!({
            "type": "interval",
            "end_ms": millis_since_epoch(*end),
            "duration_ms": duration.as_millis() as u64,
        }),
    }
}

fn data_to_json(data: &AggregationData) -> Value {
    match data {
        AggregationData::SumF64(total) => json!({ "type": "sum", "value": num(*total) }),
        AggregationData::SumI64(total) => json!({ "type": "sum", "value": total }),
        AggregationData::Count(count) => json!({ "type": "count", "value": count }),
        AggregationData::Mean { sum, count } => {
            let mean = if *count > 0 { *sum / *count as f64 } else { 0.0 };
            json!({ "type": "mean", "mean": num(mean), "count": count })
        }
        AggregationData::Distribution(dist) => json!({
            "type": "distribution",
            "count": dist.count(),
            "mean": num(dist.mean()),
            "min": num(dist.min()),
            "max": num(dist.max()),
            "sum_of_squared_deviation": num(dist.sum_of_squared_deviation()),
            "boundaries": dist.boundaries().as_slice(),
            "bucket_counts": dist.bucket_counts(),
        }),
    }
}

/// Renders one snapshot as a JSON value.
pub fn view_data_to_json(data: &ViewData) -> Value {
    let view = data.view();
    let rows: Vec<Value> = data
        .rows()
        .iter()
        .map(|(tag_values, agg)| {
            let tags: Vec<Value> = tag_values
                .iter()
                .map(|v| match v {
                    Some(value) => Value::String(value.as_str().to_owned()),
                    None => Value::Null,
                })
                .collect();
            json!({ "tags": tags, "data": data_to_json(agg) })
        })
        .collect();

    json!({
        "view": view.name().as_str(),
        "description": view.description(),
        "measure": {
            "name": view.measure().name(),
            "unit": view.measure().unit(),
            "kind": view.measure().kind().as_str(),
        },
        "aggregation": view.aggregation().kind_name(),
        "columns": view.columns().iter().map(|k| k.as_str()).collect::<Vec<_>>(),
        "window": window_to_json(data.window()),
        "rows": rows,
    })
}
