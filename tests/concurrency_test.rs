//! Concurrent producers and readers: folds are atomic and snapshots are
//! internally consistent.

use sightline::core::Config;
use sightline::stats::{
    Aggregation, AggregationData, AggregationWindow, Measure, MeasurementBatch, Stats, TagValues,
    View, ViewName,
};
use sightline::tags::{TagContext, TagKey, TagValue};
use smallvec::smallvec;
use std::thread;

const PRODUCERS: usize = 4;
const RECORDS_PER_PRODUCER: usize = 1_000;

fn latency() -> Measure {
    Measure::f64("rpc/latency", "request latency", "ms").unwrap()
}

#[test]
fn concurrent_sums_are_exact() {
    let stats = Stats::in_memory(&Config::default());
    let measure = latency();
    let key = TagKey::new("producer").unwrap();
    let view = View::new(
        ViewName::new("latency/sum").unwrap(),
        "total latency by producer",
        measure.clone(),
        Aggregation::Sum,
        vec![key.clone()],
        AggregationWindow::Cumulative,
    )
    .unwrap();
    stats.register_view(view).unwrap();

    let mut handles = Vec::new();
    for producer in 0..PRODUCERS {
        let stats = stats.clone();
        let measure = measure.clone();
        let key = key.clone();
        handles.push(thread::spawn(move || {
            let ctx = TagContext::builder()
                .put(key, TagValue::new(format!("p{}", producer)).unwrap())
                .build();
            for _ in 0..RECORDS_PER_PRODUCER {
                stats
                    .record(&ctx, MeasurementBatch::new().put_f64(&measure, 1.0))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let data = stats
        .view_data(&ViewName::new("latency/sum").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(data.rows().len(), PRODUCERS);
    for producer in 0..PRODUCERS {
        let row: TagValues = smallvec![Some(TagValue::new(format!("p{}", producer)).unwrap())];
        assert_eq!(
            data.row(&row),
            Some(&AggregationData::SumF64(RECORDS_PER_PRODUCER as f64))
        );
    }
}

#[test]
fn snapshots_never_observe_torn_mean_state() {
    let stats = Stats::in_memory(&Config::default());
    let measure = latency();
    let view = View::new(
        ViewName::new("latency/mean").unwrap(),
        "mean latency",
        measure.clone(),
        Aggregation::Mean,
        vec![],
        AggregationWindow::Cumulative,
    )
    .unwrap();
    stats.register_view(view).unwrap();

    // Every producer folds the constant 2.0, so in any consistent snapshot
    // sum == 2.0 * count. A torn sum/count pair breaks the equality.
    let mut producers = Vec::new();
    for _ in 0..PRODUCERS {
        let stats = stats.clone();
        let measure = measure.clone();
        producers.push(thread::spawn(move || {
            for _ in 0..RECORDS_PER_PRODUCER {
                stats
                    .record(
                        &TagContext::empty(),
                        MeasurementBatch::new().put_f64(&measure, 2.0),
                    )
                    .unwrap();
            }
        }));
    }

    let reader = {
        let stats = stats.clone();
        thread::spawn(move || {
            let name = ViewName::new("latency/mean").unwrap();
            let row: TagValues = smallvec![];
            for _ in 0..200 {
                let data = stats.view_data(&name).unwrap().unwrap();
                if let Some(AggregationData::Mean { sum, count }) = data.row(&row) {
                    assert_eq!(*sum, 2.0 * *count as f64, "torn mean accumulator");
                }
            }
        })
    };

    for handle in producers {
        handle.join().unwrap();
    }
    reader.join().unwrap();

    let row: TagValues = smallvec![];
    let data = stats
        .view_data(&ViewName::new("latency/mean").unwrap())
        .unwrap()
        .unwrap();
    match data.row(&row) {
        Some(AggregationData::Mean { sum, count }) => {
            assert_eq!(*count, (PRODUCERS * RECORDS_PER_PRODUCER) as u64);
            assert_eq!(*sum, 2.0 * (PRODUCERS * RECORDS_PER_PRODUCER) as f64);
        }
        other => panic!("expected mean row, got {:?}", other),
    }
}

#[test]
fn concurrent_registration_and_reads_stay_consistent() {
    let stats = Stats::in_memory(&Config::default());
    let measure = latency();

    let registrar = {
        let stats = stats.clone();
        let measure = measure.clone();
        thread::spawn(move || {
            for i in 0..50 {
                let view = View::new(
                    ViewName::new(format!("view-{}", i)).unwrap(),
                    "sum",
                    measure.clone(),
                    Aggregation::Sum,
                    vec![],
                    AggregationWindow::Cumulative,
                )
                .unwrap();
                stats.register_view(view).unwrap();
            }
        })
    };

    let reader = {
        let stats = stats.clone();
        thread::spawn(move || {
            let mut last = 0;
            for _ in 0..200 {
                let exported = stats.exported_views();
                // Registrations only grow the set.
                assert!(exported.len() >= last);
                last = exported.len();
            }
        })
    };

    registrar.join().unwrap();
    reader.join().unwrap();
    assert_eq!(stats.exported_views().len(), 50);
}
